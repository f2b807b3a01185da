use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Identity of one running environment instance.
///
/// Created when a start is requested and never mutated afterwards. The
/// compound `workspace:environment:owner` form is what gets passed to the
/// bootstrap agent on its command line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuntimeIdentity {
    pub workspace_id: String,
    pub environment_name: String,
    pub owner_id: String,
}

impl RuntimeIdentity {
    pub fn new(
        workspace_id: impl Into<String>,
        environment_name: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            environment_name: environment_name.into(),
            owner_id: owner_id.into(),
        }
    }
}

impl Display for RuntimeIdentity {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.workspace_id, self.environment_name, self.owner_id
        )
    }
}

impl FromStr for RuntimeIdentity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(ws), Some(env), Some(owner)) if !ws.is_empty() && !env.is_empty() => {
                Ok(Self::new(ws, env, owner))
            }
            _ => Err(CoreError::InvalidIdentity(s.to_string())),
        }
    }
}
