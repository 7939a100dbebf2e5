use common::Result;
use datafusion::arrow::array::{Array, StringArray};
use datafusion::arrow::datatypes::DataType;
use datafusion::common::DataFusionError;
use datafusion::execution::context::SessionContext;
use datafusion::logical_expr::{ColumnarValue, Volatility, create_udf};
use std::sync::Arc;

pub const DATASET_PROVIDER: &str = "dataset_provider";

/// Registers all UDFs with the SessionContext
pub fn register_udfs(ctx: &SessionContext) {
    let dataset_provider = create_udf(
        DATASET_PROVIDER,
        vec![DataType::Utf8],
        DataType::Utf8,
        Volatility::Immutable,
        Arc::new(|args| extract_provider(args).map_err(|e| DataFusionError::Internal(e.to_string()))),
    );

    ctx.register_udf(dataset_provider);
}

/// `EO:ESA:DAT:SENTINEL-3` is served by `ESA`.
pub fn provider_of(dataset_id: &str) -> Option<&str> {
    dataset_id.split(':').nth(1).filter(|segment| !segment.is_empty())
}

fn extract_provider(args: &[ColumnarValue]) -> Result<ColumnarValue> {
    let arrays = ColumnarValue::values_to_arrays(args)?;
    let ids = arrays
        .first()
        .and_then(|array| array.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| DataFusionError::Internal("Expected string array".to_string()))?;

    let result: StringArray = ids
        .iter()
        .map(|id| id.and_then(provider_of))
        .collect();

    Ok(ColumnarValue::Array(Arc::new(result)))
}
