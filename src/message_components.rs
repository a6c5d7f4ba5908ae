//! Rendering of [`Reply`] button rows as Discord message components

use serenity::builder::CreateComponents;
use serenity::model::application::component::ButtonStyle;

use crate::core::{ButtonKind, Reply};

/// Discord allows at most five buttons per row and five rows per message
const MAX_ROWS: usize = 5;
const MAX_BUTTONS: usize = 5;

pub fn button_style(kind: ButtonKind) -> ButtonStyle {
    match kind {
        ButtonKind::Primary => ButtonStyle::Primary,
        ButtonKind::Secondary => ButtonStyle::Secondary,
        ButtonKind::Success => ButtonStyle::Success,
        ButtonKind::Danger => ButtonStyle::Danger,
    }
}

pub fn render_components(reply: &Reply) -> CreateComponents {
    let mut components = CreateComponents::default();
    for row in reply.rows.iter().take(MAX_ROWS) {
        components.create_action_row(|action_row| {
            for button in row.iter().take(MAX_BUTTONS) {
                action_row.create_button(|b| {
                    b.custom_id(&button.custom_id)
                        .label(&button.label)
                        .style(button_style(button.kind))
                        .disabled(button.disabled)
                });
            }
            action_row
        });
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Button;

    #[test]
    fn test_rows_are_capped() {
        let mut reply = Reply::text("many");
        for i in 0..7 {
            reply = reply.with_row(vec![Button::new(
                format!("b{i}"),
                "x",
                ButtonKind::Primary,
            )]);
        }
        let components = render_components(&reply);
        assert_eq!(components.0.len(), MAX_ROWS);
    }

    #[test]
    fn test_plain_reply_has_no_components() {
        assert!(render_components(&Reply::text("hi")).0.is_empty());
    }
}
