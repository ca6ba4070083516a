//! Step catalog
//!
//! Maps abstract pipeline operations to step identifiers and display names.
//! Operations are what the runner executes and logs; steps are what the UI
//! renders. The mapping is many-to-one: deleting the ingestion transformer
//! and deleting the chart transformer both surface as the same step.

use serde::{Deserialize, Serialize};

/// The finest-grained unit of pipeline work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Fetch,
    DeleteData,
    DeleteIngestionTransformer,
    GenerateIngestionTransformer,
    ExecuteIngestionTransformer,
    SaveData,
    DeleteChartTransformer,
    GenerateChartTransformer,
    ExecuteChartTransformer,
    SaveChart,
}

/// The user-facing progress label a pipeline step surfaces as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    FetchingApiData,
    DeletingOldData,
    DeletingOldTransformer,
    GeneratingIngestionTransformer,
    ExecutingIngestionTransformer,
    SavingTimeseriesData,
    GeneratingChartTransformer,
    ExecutingChartTransformer,
    SavingChartConfig,
}

impl Operation {
    /// The step this operation surfaces as in the UI.
    pub fn step(&self) -> Step {
        match self {
            Operation::Fetch => Step::FetchingApiData,
            Operation::DeleteData => Step::DeletingOldData,
            Operation::DeleteIngestionTransformer | Operation::DeleteChartTransformer => {
                Step::DeletingOldTransformer
            }
            Operation::GenerateIngestionTransformer => Step::GeneratingIngestionTransformer,
            Operation::ExecuteIngestionTransformer => Step::ExecutingIngestionTransformer,
            Operation::SaveData => Step::SavingTimeseriesData,
            Operation::GenerateChartTransformer => Step::GeneratingChartTransformer,
            Operation::ExecuteChartTransformer => Step::ExecutingChartTransformer,
            Operation::SaveChart => Step::SavingChartConfig,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Fetch => "fetch",
            Operation::DeleteData => "delete-data",
            Operation::DeleteIngestionTransformer => "delete-ingestion-transformer",
            Operation::GenerateIngestionTransformer => "generate-ingestion-transformer",
            Operation::ExecuteIngestionTransformer => "execute-ingestion-transformer",
            Operation::SaveData => "save-data",
            Operation::DeleteChartTransformer => "delete-chart-transformer",
            Operation::GenerateChartTransformer => "generate-chart-transformer",
            Operation::ExecuteChartTransformer => "execute-chart-transformer",
            Operation::SaveChart => "save-chart",
        }
    }

    pub fn parse(s: &str) -> Option<Operation> {
        match s {
            "fetch" => Some(Operation::Fetch),
            "delete-data" => Some(Operation::DeleteData),
            "delete-ingestion-transformer" => Some(Operation::DeleteIngestionTransformer),
            "generate-ingestion-transformer" => Some(Operation::GenerateIngestionTransformer),
            "execute-ingestion-transformer" => Some(Operation::ExecuteIngestionTransformer),
            "save-data" => Some(Operation::SaveData),
            "delete-chart-transformer" => Some(Operation::DeleteChartTransformer),
            "generate-chart-transformer" => Some(Operation::GenerateChartTransformer),
            "execute-chart-transformer" => Some(Operation::ExecuteChartTransformer),
            "save-chart" => Some(Operation::SaveChart),
            _ => None,
        }
    }
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::FetchingApiData => "fetching-api-data",
            Step::DeletingOldData => "deleting-old-data",
            Step::DeletingOldTransformer => "deleting-old-transformer",
            Step::GeneratingIngestionTransformer => "generating-ingestion-transformer",
            Step::ExecutingIngestionTransformer => "executing-ingestion-transformer",
            Step::SavingTimeseriesData => "saving-timeseries-data",
            Step::GeneratingChartTransformer => "generating-chart-transformer",
            Step::ExecutingChartTransformer => "executing-chart-transformer",
            Step::SavingChartConfig => "saving-chart-config",
        }
    }

    pub fn parse(s: &str) -> Option<Step> {
        match s {
            "fetching-api-data" => Some(Step::FetchingApiData),
            "deleting-old-data" => Some(Step::DeletingOldData),
            "deleting-old-transformer" => Some(Step::DeletingOldTransformer),
            "generating-ingestion-transformer" => Some(Step::GeneratingIngestionTransformer),
            "executing-ingestion-transformer" => Some(Step::ExecutingIngestionTransformer),
            "saving-timeseries-data" => Some(Step::SavingTimeseriesData),
            "generating-chart-transformer" => Some(Step::GeneratingChartTransformer),
            "executing-chart-transformer" => Some(Step::ExecutingChartTransformer),
            "saving-chart-config" => Some(Step::SavingChartConfig),
            _ => None,
        }
    }

    /// Human-readable label the UI renders for this step.
    pub fn display_name(&self) -> &'static str {
        match self {
            Step::FetchingApiData => "Fetching data from integration",
            Step::DeletingOldData => "Deleting old data points",
            Step::DeletingOldTransformer => "Deleting old transformer",
            Step::GeneratingIngestionTransformer => "Generating ingestion transformer",
            Step::ExecutingIngestionTransformer => "Normalizing fetched data",
            Step::SavingTimeseriesData => "Saving time-series data",
            Step::GeneratingChartTransformer => "Generating chart transformer",
            Step::ExecutingChartTransformer => "Building chart configuration",
            Step::SavingChartConfig => "Saving chart configuration",
        }
    }
}

/// Display name for a raw step identifier
///
/// Unknown identifiers fall back to the identifier itself so old log rows
/// written under a retired vocabulary still render.
pub fn step_display_name(id: &str) -> &str {
    match Step::parse(id) {
        Some(step) => step.display_name(),
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_step_mapping_is_total() {
        let all = [
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
        for op in all {
            // Every operation resolves to a step with a non-empty label.
            assert!(!op.step().display_name().is_empty());
            assert_eq!(Operation::parse(op.as_str()), Some(op));
        }
    }

    #[test]
    fn test_transformer_deletes_share_a_step() {
        assert_eq!(
            Operation::DeleteIngestionTransformer.step(),
            Operation::DeleteChartTransformer.step()
        );
        assert_eq!(
            Operation::DeleteIngestionTransformer.step(),
            Step::DeletingOldTransformer
        );
    }

    #[test]
    fn test_step_identifier_round_trip() {
        for id in [
            "fetching-api-data",
            "deleting-old-data",
            "deleting-old-transformer",
            "generating-ingestion-transformer",
            "executing-ingestion-transformer",
            "saving-timeseries-data",
            "generating-chart-transformer",
            "executing-chart-transformer",
            "saving-chart-config",
        ] {
            let step = Step::parse(id).unwrap();
            assert_eq!(step.as_str(), id);
        }
    }

    #[test]
    fn test_unknown_step_falls_back_to_raw_identifier() {
        assert_eq!(step_display_name("reticulating-splines"), "reticulating-splines");
        assert_eq!(
            step_display_name("fetching-api-data"),
            "Fetching data from integration"
        );
    }
}
