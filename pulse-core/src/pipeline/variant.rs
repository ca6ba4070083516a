//! Pipeline type registry
//!
//! Each pipeline variant is a fixed, ordered list of operations. The choice
//! of variant encodes whether raw data and/or the generated transformers
//! must be rebuilt.

use serde::{Deserialize, Serialize};

use crate::pipeline::step::Operation;

/// A named pipeline variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineVariant {
    /// Brand-new metric: full list; the deletes are no-ops.
    Create,
    /// Refetch data and rerun the existing transformers.
    SoftRefresh,
    /// Full regeneration: delete data and both transformers, rebuild all.
    HardRefresh,
    /// Rebuild only the chart side; no data fetch at all.
    ChartOnly,
    /// Rebuild the ingestion side, reuse the existing chart transformer.
    IngestionOnly,
}

const FULL: &[Operation] = &[
    Operation::Fetch,
    Operation::DeleteData,
    Operation::DeleteIngestionTransformer,
    Operation::GenerateIngestionTransformer,
    Operation::ExecuteIngestionTransformer,
    Operation::SaveData,
    Operation::DeleteChartTransformer,
    Operation::GenerateChartTransformer,
    Operation::ExecuteChartTransformer,
    Operation::SaveChart,
];

const SOFT_REFRESH: &[Operation] = &[
    Operation::Fetch,
    Operation::ExecuteIngestionTransformer,
    Operation::SaveData,
    Operation::ExecuteChartTransformer,
    Operation::SaveChart,
];

const CHART_ONLY: &[Operation] = &[
    Operation::DeleteChartTransformer,
    Operation::GenerateChartTransformer,
    Operation::ExecuteChartTransformer,
    Operation::SaveChart,
];

const INGESTION_ONLY: &[Operation] = &[
    Operation::Fetch,
    Operation::DeleteIngestionTransformer,
    Operation::GenerateIngestionTransformer,
    Operation::ExecuteIngestionTransformer,
    Operation::SaveData,
    Operation::ExecuteChartTransformer,
    Operation::SaveChart,
];

impl PipelineVariant {
    /// The ordered operations this variant executes.
    pub fn operations(&self) -> &'static [Operation] {
        match self {
            PipelineVariant::Create | PipelineVariant::HardRefresh => FULL,
            PipelineVariant::SoftRefresh => SOFT_REFRESH,
            PipelineVariant::ChartOnly => CHART_ONLY,
            PipelineVariant::IngestionOnly => INGESTION_ONLY,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineVariant::Create => "create",
            PipelineVariant::SoftRefresh => "soft-refresh",
            PipelineVariant::HardRefresh => "hard-refresh",
            PipelineVariant::ChartOnly => "chart-only",
            PipelineVariant::IngestionOnly => "ingestion-only",
        }
    }

    pub fn parse(s: &str) -> Option<PipelineVariant> {
        match s {
            "create" => Some(PipelineVariant::Create),
            "soft-refresh" => Some(PipelineVariant::SoftRefresh),
            "hard-refresh" => Some(PipelineVariant::HardRefresh),
            "chart-only" => Some(PipelineVariant::ChartOnly),
            "ingestion-only" => Some(PipelineVariant::IngestionOnly),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PipelineVariant; 5] = [
        PipelineVariant::Create,
        PipelineVariant::SoftRefresh,
        PipelineVariant::HardRefresh,
        PipelineVariant::ChartOnly,
        PipelineVariant::IngestionOnly,
    ];

    #[test]
    fn test_every_variant_has_operations() {
        for variant in ALL {
            assert!(!variant.operations().is_empty(), "{variant:?}");
        }
    }

    #[test]
    fn test_create_and_hard_refresh_share_the_full_list() {
        assert_eq!(
            PipelineVariant::Create.operations(),
            PipelineVariant::HardRefresh.operations()
        );
        assert_eq!(PipelineVariant::HardRefresh.operations().len(), 10);
    }

    #[test]
    fn test_chart_only_never_fetches() {
        assert!(
            !PipelineVariant::ChartOnly
                .operations()
                .contains(&Operation::Fetch)
        );
    }

    #[test]
    fn test_only_full_variants_delete_data() {
        for variant in ALL {
            let deletes_data = variant.operations().contains(&Operation::DeleteData);
            let expected = matches!(
                variant,
                PipelineVariant::Create | PipelineVariant::HardRefresh
            );
            assert_eq!(deletes_data, expected, "{variant:?}");
        }
    }

    #[test]
    fn test_variant_name_round_trip() {
        for variant in ALL {
            assert_eq!(PipelineVariant::parse(variant.as_str()), Some(variant));
        }
    }
}
