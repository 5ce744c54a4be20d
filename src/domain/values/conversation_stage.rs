use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dialogue stage reported by the conversational agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    #[default]
    Greeting,
    CollectingName,
    CollectingEmail,
    QualifyingRevenue,
    QualifyingCapital,
    QualifyingTime,
    QualifyingReason,
    TransformationQuestions,
    PriceDiscussion,
    Closing,
}

impl ConversationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStage::Greeting => "greeting",
            ConversationStage::CollectingName => "collecting_name",
            ConversationStage::CollectingEmail => "collecting_email",
            ConversationStage::QualifyingRevenue => "qualifying_revenue",
            ConversationStage::QualifyingCapital => "qualifying_capital",
            ConversationStage::QualifyingTime => "qualifying_time",
            ConversationStage::QualifyingReason => "qualifying_reason",
            ConversationStage::TransformationQuestions => "transformation_questions",
            ConversationStage::PriceDiscussion => "price_discussion",
            ConversationStage::Closing => "closing",
        }
    }
}

impl fmt::Display for ConversationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "greeting" => Ok(ConversationStage::Greeting),
            "collecting_name" => Ok(ConversationStage::CollectingName),
            "collecting_email" => Ok(ConversationStage::CollectingEmail),
            "qualifying_revenue" => Ok(ConversationStage::QualifyingRevenue),
            "qualifying_capital" => Ok(ConversationStage::QualifyingCapital),
            "qualifying_time" => Ok(ConversationStage::QualifyingTime),
            "qualifying_reason" => Ok(ConversationStage::QualifyingReason),
            "transformation_questions" => Ok(ConversationStage::TransformationQuestions),
            "price_discussion" => Ok(ConversationStage::PriceDiscussion),
            "closing" => Ok(ConversationStage::Closing),
            _ => Err(format!("Unknown conversation stage: {s}")),
        }
    }
}
