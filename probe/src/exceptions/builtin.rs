use super::ExceptionRule;

const DAY_START_0303: &str = "2025-10-03T00:00:00.000Z";
const DAY_END_0303: &str = "2025-10-03T23:59:59.999Z";

const SPOT5_BBOX: [f64; 4] = [15.7421745918424, 30.67706860391895, 33.090693529791174, 43.67197322929656];

fn with_fixed_day(rule: ExceptionRule) -> ExceptionRule {
    rule.force("startdate", DAY_START_0303).force("enddate", DAY_END_0303)
}

fn without_production_status() -> ExceptionRule {
    ExceptionRule::new()
        .notes("productionStatus is declared but rejected by the search endpoint")
        .remove("productionStatus")
}

/// Known corrections, in precedence order.
pub fn builtin_rules() -> Vec<(&'static str, ExceptionRule)> {
    vec![
        (
            r"^EO:CLMS:DAT:CLMS_GLOBAL_LST_5KM_V1_HOURLY_NETCDF$",
            ExceptionRule::new()
                .notes("Minimal query fails; every fixed parameter must be supplied")
                .force("productType", "LST")
                .force("productionStatus", "ARCHIVED")
                .force("acquisitionType", "NOMINAL")
                .force("platform", "GOES")
                .force("processingCenter", "IPMA")
                .force("resolution", "5000"),
        ),
        (
            r"^EO:MO:DAT:NWSHELF$",
            ExceptionRule::new().notes("Fails when bbox is included").remove("bbox"),
        ),
        (
            r"^EO:MO:DAT:NWSHELF_MULTIYEAR_BGC_004_011$",
            ExceptionRule::new().notes("Hangs when bbox is included").remove("bbox"),
        ),
        (
            r"^EO:EUM:DAT:06.*",
            ExceptionRule::new()
                .notes("Family needs repeatCycleIdentifier, which metadata does not mark required")
                .require_with("repeatCycleIdentifier", "2"),
        ),
        (
            r"^EO:ESA:DAT:SENTINEL-3$",
            ExceptionRule::new()
                .notes("Fails on empty startdate/enddate")
                .require_non_empty("startdate")
                .require_non_empty("enddate"),
        ),
        (
            r"^EO:CLMS:DAT:CLMS_GLOBAL_DMP_300M_V1_10DAILY_NETCDF$",
            ExceptionRule::new()
                .notes("productionStatus must be ARCHIVED, not CANCELLED")
                .force("productionStatus", "ARCHIVED"),
        ),
        (
            r"^EO:ECMWF:DAT:CAMS_GLOBAL_ATMOSPHERIC_COMPOSITION_FORECASTS$",
            with_fixed_day(
                ExceptionRule::new()
                    .notes("Declared pressure_level/model_level block the query; dates required")
                    .remove("pressure_level")
                    .remove("model_level"),
            ),
        ),
        (
            r"^EO:ECMWF:DAT:CAMS_GLOBAL_FIRE_EMISSIONS_GFAS$",
            with_fixed_day(ExceptionRule::new().notes("startdate and enddate are required")),
        ),
        (
            r"^EO:ECMWF:DAT:CAMS_GLOBAL_GREENHOUSE_GAS_FORECASTS$",
            with_fixed_day(ExceptionRule::new().notes("startdate and enddate are required")),
        ),
        (
            r"^EO:ECMWF:DAT:CAMS_GLOBAL_REANALYSIS_EAC4$",
            with_fixed_day(ExceptionRule::new().notes("startdate and enddate are required")),
        ),
        (
            r"^EO:ECMWF:DAT:CAMS_SOLAR_RADIATION_TIMESERIES$",
            ExceptionRule::new()
                .notes("Dates and a point location with altitude are required")
                .force("startdate", "2025-10-06T00:00:00.000Z")
                .force("enddate", "2025-10-06T23:59:59.999Z")
                .force("latitude", "40")
                .force("longitude", "40")
                .force("altitude", "1000"),
        ),
        (
            r"^EO:ECMWF:DAT:REANALYSIS_ERA5_LAND_TIMESERIES$",
            with_fixed_day(
                ExceptionRule::new()
                    .notes("Dates and a point location are required")
                    .force("latitude", "40")
                    .force("longitude", "50"),
            ),
        ),
        (
            r"^EO:ECMWF:DAT:REANALYSIS_ERA5_SINGLE_LEVELS_TIMESERIES$",
            with_fixed_day(
                ExceptionRule::new()
                    .notes("Dates and a point location are required")
                    .force("latitude", "40")
                    .force("longitude", "50"),
            ),
        ),
        (
            r"^EO:ECMWF:DAT:CAMS_GLOBAL_GHG_REANALYSIS_EGG4$",
            with_fixed_day(ExceptionRule::new().notes("Dates missing from metadata")),
        ),
        (r"^EO:CLMS:DAT:CLMS_GLOBAL_BA_300M_V3_DAILY_NETCDF$", without_production_status()),
        (r"^EO:CLMS:DAT:CLMS_GLOBAL_GDMP_300M_V1_10DAILY_NETCDF$", without_production_status()),
        (r"^EO:CLMS:DAT:CLMS_GLOBAL_LST_5KM_V1_10DAILY-DAILY-CYCLE_NETCDF$", without_production_status()),
        (r"^EO:CLMS:DAT:CLMS_GLOBAL_LST_5KM_V1_10DAILY-TCI_NETCDF$", without_production_status()),
        (r"^EO:CLMS:DAT:CLMS_GLOBAL_LST_5KM_V2_10DAILY-DAILY-CYCLE_NETCDF$", without_production_status()),
        (r"^EO:CLMS:DAT:CLMS_GLOBAL_LST_5KM_V2_10DAILY-TCI_NETCDF$", without_production_status()),
        (
            r"^EO:CNES:DAT:SWH:SPOT5$",
            ExceptionRule::new().notes("bbox is required").force("bbox", SPOT5_BBOX.to_vec()),
        ),
        (
            r"^EO:CRYO:DAT:HRSI:SWS$",
            ExceptionRule::new().notes("bbox is required").force("bbox", SPOT5_BBOX.to_vec()),
        ),
        (
            r"^EO:ECMWF:DAT:CAMS_EUROPE_AIR_QUALITY_FORECASTS$",
            ExceptionRule::new()
                .notes("Minimal query fails; dates and forecast parameters required")
                .force("startdate", "2025-10-09T00:00:00.000Z")
                .force("enddate", "2025-10-09T23:59:59.999Z")
                .force("model", "ensemble")
                .force("level", "0")
                .force("type", "forecast")
                .force("time", "00:00")
                .force("leadtime_hour", "0"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_every_builtin_pattern_compiles_and_is_anchored() {
        for (pattern, _) in builtin_rules() {
            assert!(Regex::new(pattern).is_ok(), "{pattern}");
            assert!(pattern.starts_with('^'), "{pattern}");
        }
    }

    #[test]
    fn test_exact_patterns_are_end_anchored() {
        for (pattern, _) in builtin_rules() {
            if !pattern.ends_with(".*") {
                assert!(pattern.ends_with('$'), "{pattern}");
            }
        }
    }
}
