use crate::store::Complexity;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryLevel {
    Warning,
    Info,
    Unspecified,
}

/// Display-only next-step hint derived from an article's complexity flag.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Advisory {
    pub level: AdvisoryLevel,
    pub message: &'static str,
}

pub fn advise(complexity: Complexity) -> Advisory {
    match complexity {
        Complexity::Yes => Advisory {
            level: AdvisoryLevel::Warning,
            message: "This issue is complex. Escalate to a specialist or reach out to your mentor before making changes.",
        },
        Complexity::No => Advisory {
            level: AdvisoryLevel::Info,
            message: "This issue is not complex. Continue troubleshooting with the article; your mentor is available if you get stuck.",
        },
        Complexity::Unspecified => Advisory {
            level: AdvisoryLevel::Unspecified,
            message: "Complexity status is not specified for this article.",
        },
    }
}
