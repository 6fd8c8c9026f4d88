use poise::serenity_prelude as serenity;

/// Default embed color used across the bot UI.
pub const DEFAULT_EMBED_COLOR: u32 = 0x63_66_f1;
pub const SUCCESS_EMBED_COLOR: u32 = 0x10_b9_81;
pub const FAILURE_EMBED_COLOR: u32 = 0xff_00_33;
pub const WARNING_EMBED_COLOR: u32 = 0xf5_9e_0b;

pub const SUCCESS_MARK: &str = "✅";
pub const FAILURE_MARK: &str = "❌";
pub const WARNING_MARK: &str = "⚠️";

pub fn success_embed(message: impl AsRef<str>) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .description(format!("{SUCCESS_MARK} {}", message.as_ref()))
        .color(SUCCESS_EMBED_COLOR)
}

pub fn failure_embed(message: impl AsRef<str>) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .description(format!("{FAILURE_MARK} {}", message.as_ref()))
        .color(FAILURE_EMBED_COLOR)
}

pub fn warning_embed(message: impl AsRef<str>) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .description(format!("{WARNING_MARK} {}", message.as_ref()))
        .color(WARNING_EMBED_COLOR)
}

/// One line per step, each prefixed by a pass/fail mark.
pub fn checklist<'a>(steps: impl IntoIterator<Item = (bool, &'a str)>) -> String {
    steps
        .into_iter()
        .map(|(success, message)| {
            let mark = if success { SUCCESS_MARK } else { FAILURE_MARK };
            format!("{mark} {message}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// "<Action> results" embed wrapping a [`checklist`].
pub fn results_embed(action_title: &str, checklist: String) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("{action_title} results"))
        .description(checklist)
        .color(DEFAULT_EMBED_COLOR)
}

/// Build a page of a paginated embed with a `Page x/y` footer when there is
/// more than one page.
pub fn build_paginated_embed(
    title: &str,
    description: impl Into<String>,
    page: usize,
    total_pages: usize,
) -> serenity::CreateEmbed {
    let page = page.max(1);
    let total_pages = total_pages.max(1);

    let builder = serenity::CreateEmbed::new()
        .title(title.to_owned())
        .color(DEFAULT_EMBED_COLOR)
        .description(description);

    if total_pages > 1 {
        builder.footer(serenity::CreateEmbedFooter::new(format!(
            "Page {page}/{total_pages}"
        )))
    } else {
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::checklist;

    #[test]
    fn checklist_marks_each_step() {
        let rendered = checklist([
            (true, "User `a#0001` was warned with reason spam"),
            (false, "*I couldn't DM the user*"),
        ]);

        assert_eq!(
            rendered,
            "✅ User `a#0001` was warned with reason spam\n❌ *I couldn't DM the user*"
        );
    }

    #[test]
    fn empty_checklist_is_empty() {
        assert_eq!(checklist(std::iter::empty()), "");
    }
}
