//! Command menus built from the group tree
use anyhow::{Result, anyhow};
use eframe::egui;
use grobview::{
    command::{ArgKind, ArgValue, CommandEntry, CommandFactory, GroupId},
    scene::MeshHandle,
};

/// Draws one menu per top-level group
///
/// Returns the name of the command which was clicked, if any.
pub fn draw(ui: &mut egui::Ui, factory: &CommandFactory) -> Option<String> {
    let mut clicked = None;
    for id in factory.groups().root().children() {
        group_menu(ui, factory, *id, &mut clicked);
    }
    clicked
}

fn group_menu(
    ui: &mut egui::Ui,
    factory: &CommandFactory,
    id: GroupId,
    clicked: &mut Option<String>,
) {
    let g = factory.groups().get(id);
    if g.children().is_empty() && g.commands().is_empty() {
        return;
    }
    ui.menu_button(g.name(), |ui| {
        for c in g.children() {
            group_menu(ui, factory, *c, clicked);
        }
        for name in g.commands() {
            let help = factory.get(name).map(|e| e.help()).unwrap_or("");
            if ui.button(name).on_hover_text(help).clicked() {
                *clicked = Some(name.clone());
                ui.close_menu();
            }
        }
    });
}

/// Fills in a command's arguments from the current target and path
pub fn args_for(
    entry: &CommandEntry,
    target: Option<&MeshHandle>,
    path: &str,
) -> Result<Vec<ArgValue>> {
    entry
        .args()
        .iter()
        .map(|a| match a.kind {
            ArgKind::MeshContent => target
                .cloned()
                .map(ArgValue::MeshContent)
                .ok_or_else(|| anyhow!("{} needs a mesh", entry.name())),
            ArgKind::String if path.is_empty() => {
                Err(anyhow!("{} needs a path", entry.name()))
            }
            ArgKind::String => Ok(ArgValue::String(path.to_owned())),
            // Menu commands share one join key
            ArgKind::Integer => Ok(ArgValue::Integer(0)),
            k => Err(anyhow!("can't fill {k} argument {:?}", a.name)),
        })
        .collect()
}
