use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRoleBinding {
    pub channel_id: u64,
    pub message_id: u64,
    pub emoji: String,
    pub role_id: u64,
}

/// Cap on how many of `roles` a member may hold through one message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCap {
    pub message_id: u64,
    pub roles: Vec<u64>,
    pub max: u32,
}

/// Everything the reaction listeners need for one message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReactionRoles {
    pub bindings: Vec<ReactionRoleBinding>,
    pub cap: Option<ReactionCap>,
}

impl MessageReactionRoles {
    pub fn role_for_emoji(&self, emoji: &str) -> Option<u64> {
        self.bindings
            .iter()
            .find(|binding| binding.emoji == emoji)
            .map(|binding| binding.role_id)
    }

    pub fn bound_roles(&self) -> Vec<u64> {
        let mut roles: Vec<u64> = self.bindings.iter().map(|binding| binding.role_id).collect();
        roles.sort_unstable();
        roles.dedup();
        roles
    }
}
