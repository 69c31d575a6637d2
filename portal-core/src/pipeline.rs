use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages an application passes through, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageId {
    Submitted,
    PoliceReview,
    PriorityStatus,
    CollectorReview,
    UnderReview,
    CentralReview,
    Approved,
    Disbursed,
}

impl StageId {
    pub const ALL: [StageId; 8] = [
        StageId::Submitted,
        StageId::PoliceReview,
        StageId::PriorityStatus,
        StageId::CollectorReview,
        StageId::UnderReview,
        StageId::CentralReview,
        StageId::Approved,
        StageId::Disbursed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Submitted => "submitted",
            StageId::PoliceReview => "police-review",
            StageId::PriorityStatus => "priority-status",
            StageId::CollectorReview => "collector-review",
            StageId::UnderReview => "under-review",
            StageId::CentralReview => "central-review",
            StageId::Approved => "approved",
            StageId::Disbursed => "disbursed",
        }
    }

    /// Exact match on the status code; anything else is unmatched.
    pub fn parse(status: &str) -> Option<StageId> {
        Self::ALL.into_iter().find(|id| id.as_str() == status)
    }

    /// Zero-based position in the pipeline.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Party responsible for acting on a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Holder {
    System,
    PoliceOfficer,
    DistrictCollector,
    CentralStateOfficer,
}

impl Holder {
    pub fn label(&self) -> &'static str {
        match self {
            Holder::System => "System",
            Holder::PoliceOfficer => "Police Officer",
            Holder::DistrictCollector => "District Collector",
            Holder::CentralStateOfficer => "Central/State Officer",
        }
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStage {
    pub id: StageId,
    pub title: &'static str,
    pub description: &'static str,
    pub holder: Holder,
}

pub const PIPELINE: [PipelineStage; 8] = [
    PipelineStage {
        id: StageId::Submitted,
        title: "Application Submitted",
        description: "Your application has been received",
        holder: Holder::System,
    },
    PipelineStage {
        id: StageId::PoliceReview,
        title: "Police Verification",
        description: "Under review by Police Officer",
        holder: Holder::PoliceOfficer,
    },
    PipelineStage {
        id: StageId::PriorityStatus,
        title: "Priority Assessment",
        description: "Case priority being evaluated",
        holder: Holder::PoliceOfficer,
    },
    PipelineStage {
        id: StageId::CollectorReview,
        title: "Collector Review",
        description: "Under review by District Collector",
        holder: Holder::DistrictCollector,
    },
    PipelineStage {
        id: StageId::UnderReview,
        title: "Under Review",
        description: "Detailed assessment in progress",
        holder: Holder::DistrictCollector,
    },
    PipelineStage {
        id: StageId::CentralReview,
        title: "Central Approval",
        description: "Final review by Central/State Officer",
        holder: Holder::CentralStateOfficer,
    },
    PipelineStage {
        id: StageId::Approved,
        title: "Approved",
        description: "Application approved for disbursement",
        holder: Holder::CentralStateOfficer,
    },
    PipelineStage {
        id: StageId::Disbursed,
        title: "Amount Disbursed",
        description: "Compensation amount transferred",
        holder: Holder::System,
    },
];

impl PipelineStage {
    pub fn get(id: StageId) -> &'static PipelineStage {
        &PIPELINE[id.index()]
    }

    /// Whether this stage counts as done given the application's status.
    ///
    /// `None` is an unmatched status code. The first stage is always done,
    /// and police review is done for anything other than `submitted`, so an
    /// unmatched status still marks those two.
    pub fn is_complete(&self, current: Option<StageId>) -> bool {
        use StageId::*;
        match self.id {
            Submitted => true,
            PoliceReview => current != Some(Submitted),
            PriorityStatus => matches!(
                current,
                Some(CollectorReview | UnderReview | CentralReview | Approved | Disbursed)
            ),
            CollectorReview => matches!(
                current,
                Some(UnderReview | CentralReview | Approved | Disbursed)
            ),
            UnderReview => matches!(current, Some(CentralReview | Approved | Disbursed)),
            CentralReview => matches!(current, Some(Approved | Disbursed)),
            Approved | Disbursed => current == Some(Disbursed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_matches_stage_index() {
        for (i, stage) in PIPELINE.iter().enumerate() {
            assert_eq!(stage.id.index(), i);
            assert_eq!(StageId::ALL[i], stage.id);
        }
    }

    #[test]
    fn parse_is_exact() {
        assert_eq!(StageId::parse("under-review"), Some(StageId::UnderReview));
        assert_eq!(StageId::parse("Under-Review"), None);
        assert_eq!(StageId::parse("under_review"), None);
        assert_eq!(StageId::parse(""), None);
    }

    #[test]
    fn serde_uses_status_codes() {
        let json = serde_json::to_string(&StageId::CentralReview).unwrap();
        assert_eq!(json, "\"central-review\"");
    }

    #[test]
    fn completion_for_known_statuses_covers_earlier_stages() {
        // Between the first two and the last stage, completion means the
        // pipeline has moved strictly past it.
        for current in StageId::ALL {
            for stage in &PIPELINE[..7] {
                let expected = match stage.id {
                    StageId::Submitted => true,
                    StageId::PoliceReview => current != StageId::Submitted,
                    _ => stage.id < current,
                };
                assert_eq!(
                    stage.is_complete(Some(current)),
                    expected,
                    "stage {} at status {}",
                    stage.id,
                    current
                );
            }
            assert_eq!(
                PipelineStage::get(StageId::Disbursed).is_complete(Some(current)),
                current == StageId::Disbursed
            );
        }
    }

    #[test]
    fn unmatched_status_marks_only_the_first_two() {
        let done: Vec<_> = PIPELINE
            .iter()
            .filter(|s| s.is_complete(None))
            .map(|s| s.id)
            .collect();
        assert_eq!(done, vec![StageId::Submitted, StageId::PoliceReview]);
    }
}
