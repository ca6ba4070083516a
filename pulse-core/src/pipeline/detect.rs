//! Pipeline type detection
//!
//! Some consumers only see the step log, not the triggering call, and must
//! reconstruct which variant ran to render an appropriate label. The step
//! vocabularies of the variants overlap, so this is a heuristic over which
//! steps were observed, not a stored fact.

use crate::pipeline::step::Step;
use crate::pipeline::variant::PipelineVariant;

/// Infer which pipeline variant produced the observed steps.
///
/// Priority order:
/// 1. no fetch step -> `ChartOnly` (only that variant skips the fetch);
/// 2. a data-delete step -> `HardRefresh` (only that family deletes data);
/// 3. a transformer-delete plus an ingestion-generate -> `IngestionOnly`;
/// 4. otherwise `SoftRefresh`, which reuses existing transformers.
///
/// Pure: the same input always yields the same variant.
pub fn detect_variant(steps: &[Step]) -> PipelineVariant {
    if !steps.contains(&Step::FetchingApiData) {
        return PipelineVariant::ChartOnly;
    }

    if steps.contains(&Step::DeletingOldData) {
        return PipelineVariant::HardRefresh;
    }

    if steps.contains(&Step::DeletingOldTransformer)
        && steps.contains(&Step::GeneratingIngestionTransformer)
    {
        return PipelineVariant::IngestionOnly;
    }

    PipelineVariant::SoftRefresh
}

/// Convenience over raw step identifiers, skipping any unknown ones.
pub fn detect_variant_from_ids<S: AsRef<str>>(ids: &[S]) -> PipelineVariant {
    let steps: Vec<Step> = ids.iter().filter_map(|id| Step::parse(id.as_ref())).collect();
    detect_variant(&steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_hard_refresh_from_full_step_trail() {
        let ids = [
            "fetching-api-data",
            "deleting-old-data",
            "generating-ingestion-transformer",
            "executing-ingestion-transformer",
            "saving-timeseries-data",
            "generating-chart-transformer",
            "executing-chart-transformer",
            "saving-chart-config",
        ];
        assert_eq!(detect_variant_from_ids(&ids), PipelineVariant::HardRefresh);
    }

    #[test]
    fn test_detects_chart_only_without_fetch() {
        let ids = [
            "generating-chart-transformer",
            "executing-chart-transformer",
            "saving-chart-config",
        ];
        assert_eq!(detect_variant_from_ids(&ids), PipelineVariant::ChartOnly);
    }

    #[test]
    fn test_detects_ingestion_only() {
        let steps = [
            Step::FetchingApiData,
            Step::DeletingOldTransformer,
            Step::GeneratingIngestionTransformer,
            Step::ExecutingIngestionTransformer,
        ];
        assert_eq!(detect_variant(&steps), PipelineVariant::IngestionOnly);
    }

    #[test]
    fn test_defaults_to_soft_refresh() {
        let steps = [
            Step::FetchingApiData,
            Step::ExecutingIngestionTransformer,
            Step::SavingTimeseriesData,
        ];
        assert_eq!(detect_variant(&steps), PipelineVariant::SoftRefresh);
    }

    #[test]
    fn test_detection_is_pure() {
        let steps = [Step::FetchingApiData, Step::DeletingOldData];
        assert_eq!(detect_variant(&steps), detect_variant(&steps));
    }

    #[test]
    fn test_unknown_identifiers_are_ignored() {
        let ids = ["fetching-api-data", "not-a-real-step", "deleting-old-data"];
        assert_eq!(detect_variant_from_ids(&ids), PipelineVariant::HardRefresh);
    }

    #[test]
    fn test_detects_variant_mid_run() {
        // A running soft refresh that has only fetched so far.
        let steps = [Step::FetchingApiData];
        assert_eq!(detect_variant(&steps), PipelineVariant::SoftRefresh);
    }
}
