/// What the reaction listener should do for a reaction add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionDecision {
    Grant(u64),
    /// The member is at the cap: pull the reaction back and grant nothing.
    RemoveReaction,
    Ignore,
}

/// Decide a reaction-add outcome from the bound role, the optional cap
/// `(capped roles, max)` and the roles the member currently holds.
pub fn evaluate_reaction(
    bound_role: Option<u64>,
    cap: Option<(&[u64], u32)>,
    member_roles: &[u64],
) -> ReactionDecision {
    if let Some((capped_roles, max)) = cap {
        let held = capped_roles
            .iter()
            .filter(|role| member_roles.contains(role))
            .count();

        if held >= max as usize {
            return ReactionDecision::RemoveReaction;
        }
    }

    match bound_role {
        Some(role) => ReactionDecision::Grant(role),
        None => ReactionDecision::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::{ReactionDecision, evaluate_reaction};

    #[test]
    fn grants_bound_role_without_cap() {
        assert_eq!(evaluate_reaction(Some(7), None, &[]), ReactionDecision::Grant(7));
        assert_eq!(evaluate_reaction(None, None, &[1, 2]), ReactionDecision::Ignore);
    }

    #[test]
    fn cap_blocks_once_reached() {
        let capped = [1_u64, 2, 3];

        assert_eq!(
            evaluate_reaction(Some(2), Some((&capped, 1)), &[9]),
            ReactionDecision::Grant(2)
        );
        assert_eq!(
            evaluate_reaction(Some(2), Some((&capped, 1)), &[1, 9]),
            ReactionDecision::RemoveReaction
        );
        assert_eq!(
            evaluate_reaction(Some(3), Some((&capped, 2)), &[1]),
            ReactionDecision::Grant(3)
        );
        assert_eq!(
            evaluate_reaction(Some(3), Some((&capped, 2)), &[1, 2]),
            ReactionDecision::RemoveReaction
        );
    }

    #[test]
    fn zero_cap_always_removes() {
        assert_eq!(
            evaluate_reaction(Some(1), Some((&[1], 0)), &[]),
            ReactionDecision::RemoveReaction
        );
    }
}
