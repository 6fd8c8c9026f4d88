pub mod moderation;
pub mod utility;

use warden_core::{Data, Error};

pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        moderation::ban::ban(),
        moderation::unban::unban(),
        moderation::kick::kick(),
        moderation::mute::mute(),
        moderation::unmute::unmute(),
        moderation::warn::warn(),
        moderation::cases::cases(),
        moderation::reason::reason(),
        moderation::context_menu::ban_message_author(),
        moderation::context_menu::kick_message_author(),
        moderation::context_menu::warn_message_author(),
        moderation::context_menu::mute_user(),
        utility::embed::embed(),
        utility::reactroles::reactroles(),
        utility::verifypanel::verifypanel(),
    ]
}

#[cfg(test)]
mod tests {
    use super::commands;

    #[test]
    fn every_command_has_a_unique_name() {
        let commands = commands();
        let mut names: Vec<&str> = commands.iter().map(|command| command.name.as_str()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();

        assert_eq!(names.len(), total);
        assert!(names.contains(&"reactroles"));
    }
}
