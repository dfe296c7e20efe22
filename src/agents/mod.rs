pub mod conversation;
pub mod survey;
pub mod traits;
pub mod weather;

pub use survey::SurveyAgent;
pub use traits::{AgentBehavior, AgentRequest};
pub use weather::WeatherAgent;
