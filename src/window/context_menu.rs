//! Context menu for right-click popup in the terminal window
//!
//! Provides an egui-based two-entry popup wired to the clipboard operations.

use super::terminal::TerminalAction;
use crate::core::theme::Theme;
use arboard::Clipboard;

/// Menu entries, in display order
pub const MENU_ITEMS: [&str; 2] = ["Copy", "Paste"];

/// Context menu state for right-click popup
#[derive(Default)]
pub struct ContextMenuState {
    pub is_open: bool,
    pub position: egui::Pos2,
    /// Time when menu was opened (to prevent immediate close)
    pub opened_time: f64,
}

/// Render context menu and return any triggered actions
pub fn render_context_menu(
    ctx: &egui::Context,
    context_menu: &mut ContextMenuState,
    theme: Theme,
    has_selection: bool,
) -> Vec<TerminalAction> {
    let mut actions = Vec::new();
    let mut close_menu = false;

    let current_time = ctx.input(|i| i.time);

    // If menu just opened, record the time and don't process close events yet
    if context_menu.opened_time == 0.0 {
        context_menu.opened_time = current_time;
    }

    // Don't allow closing for 150ms after opening (prevents immediate close
    // from the opening right-click)
    let can_close = current_time > context_menu.opened_time + 0.15;

    // Menu position, clamped to window bounds
    let screen_rect = ctx.screen_rect();
    let menu_width = 160.0;
    let menu_item_height = 28.0;
    let menu_height = MENU_ITEMS.len() as f32 * menu_item_height + 16.0;

    let mut pos = context_menu.position;
    if pos.x + menu_width > screen_rect.max.x {
        pos.x = screen_rect.max.x - menu_width - 10.0;
    }
    if pos.y + menu_height > screen_rect.max.y {
        pos.y = screen_rect.max.y - menu_height - 10.0;
    }

    // Check clipboard
    let has_clipboard = Clipboard::new()
        .ok()
        .and_then(|mut c| c.get_text().ok())
        .map(|t| !t.is_empty())
        .unwrap_or(false);

    let menu_response = egui::Area::new(egui::Id::new("context_menu"))
        .fixed_pos(pos)
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style())
                .fill(theme.popup_background())
                .stroke(egui::Stroke::new(1.0, theme.popup_border()))
                .rounding(6.0)
                .inner_margin(egui::Margin::symmetric(6.0, 6.0))
                .show(ui, |ui| {
                    ui.set_width(menu_width - 12.0);
                    ui.style_mut().spacing.item_spacing = egui::vec2(0.0, 2.0);
                    ui.style_mut().visuals.widgets.hovered.bg_fill =
                        theme.selection_background();

                    // Copy
                    let text_color = if has_selection {
                        theme.foreground()
                    } else {
                        theme.disabled_foreground()
                    };
                    let btn = egui::Button::new(
                        egui::RichText::new(MENU_ITEMS[0]).size(13.0).color(text_color),
                    )
                    .fill(egui::Color32::TRANSPARENT)
                    .min_size(egui::vec2(menu_width - 12.0, menu_item_height));

                    if ui.add(btn).clicked() {
                        actions.push(TerminalAction::Copy);
                        close_menu = true;
                    }

                    // Paste
                    let text_color = if has_clipboard {
                        theme.foreground()
                    } else {
                        theme.disabled_foreground()
                    };
                    let btn = egui::Button::new(
                        egui::RichText::new(MENU_ITEMS[1]).size(13.0).color(text_color),
                    )
                    .fill(egui::Color32::TRANSPARENT)
                    .min_size(egui::vec2(menu_width - 12.0, menu_item_height));

                    if ui.add(btn).clicked() {
                        actions.push(TerminalAction::Paste);
                        close_menu = true;
                    }
                });
        });

    let menu_rect = menu_response.response.rect;

    // Close menu on left-click outside (after grace period)
    if can_close {
        let mouse_pos = ctx.input(|i| i.pointer.hover_pos());
        if let Some(mouse) = mouse_pos {
            let left_clicked =
                ctx.input(|i| i.pointer.button_clicked(egui::PointerButton::Primary));
            if left_clicked && !menu_rect.contains(mouse) {
                close_menu = true;
            }
        }
    }

    if close_menu {
        context_menu.is_open = false;
        context_menu.opened_time = 0.0;
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_has_copy_then_paste() {
        assert_eq!(MENU_ITEMS.len(), 2);
        assert_eq!(MENU_ITEMS[0], "Copy");
        assert_eq!(MENU_ITEMS[1], "Paste");
    }

    #[test]
    fn test_render_without_clicks_produces_no_actions() {
        let ctx = egui::Context::default();
        let mut state = ContextMenuState {
            is_open: true,
            position: egui::pos2(50.0, 50.0),
            opened_time: 0.0,
        };

        let mut actions = Vec::new();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            actions = render_context_menu(ctx, &mut state, Theme, false);
        });

        assert!(actions.is_empty());
        // Grace period keeps the menu open on the opening frame
        assert!(state.is_open);
        assert!(state.opened_time >= 0.0);
    }
}
