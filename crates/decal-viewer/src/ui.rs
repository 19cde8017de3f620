//! egui debug panel over the decal parameters and toggles.

use texspace_decals::params::{MAX_HALF_WIDTH, MAX_ROTATION, MIN_HALF_WIDTH, MIN_ROTATION};
use texspace_decals::{DecalParams, DecalSettings, HitRecord};

/// Requests raised by the panel this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UiActions {
    pub params_changed: bool,
    pub clear_canvas: bool,
}

pub struct PanelView<'a> {
    pub decal_names: &'a [String],
    pub last_hit: &'a HitRecord,
    pub conservative_note: Option<&'a str>,
}

/// Parameter controls. Returns true if any value changed.
fn param_controls(ui: &mut egui::Ui, params: &mut DecalParams, decal_names: &[String]) -> bool {
    let mut changed = false;

    changed |= ui
        .add(
            egui::DragValue::new(&mut params.rotation_degrees)
                .speed(1.0)
                .clamp_range(MIN_ROTATION..=MAX_ROTATION)
                .prefix("Decal Rotation: "),
        )
        .changed();

    changed |= ui
        .add(
            egui::DragValue::new(&mut params.half_width)
                .speed(0.1)
                .clamp_range(MIN_HALF_WIDTH..=MAX_HALF_WIDTH)
                .prefix("Decal Size: "),
        )
        .changed();

    ui.add_space(4.0);
    ui.label("Selected Decal");
    egui::ScrollArea::vertical()
        .id_source("decal_list")
        .max_height(96.0)
        .show(ui, |ui| {
            for (index, name) in decal_names.iter().enumerate() {
                if ui
                    .selectable_label(params.decal_index == index, name.as_str())
                    .clicked()
                    && params.decal_index != index
                {
                    params.decal_index = index;
                    changed = true;
                }
            }
        });

    changed
}

pub fn draw_panel(
    ctx: &egui::Context,
    params: &mut DecalParams,
    settings: &mut DecalSettings,
    view: &PanelView<'_>,
) -> UiActions {
    let mut actions = UiActions::default();

    egui::Window::new("Texture Space Decals")
        .default_pos([10.0, 10.0])
        .resizable(false)
        .show(ctx, |ui| {
            if !settings.randomize_on_pick {
                actions.params_changed = param_controls(ui, params, view.decal_names);
                ui.separator();
            }

            ui.checkbox(&mut settings.randomize_on_pick, "Randomize Decals");
            ui.checkbox(&mut settings.visualize_projector_frustum, "Visualize Projector Frustum");
            ui.checkbox(&mut settings.visualize_hit_point, "Visualize Hit Point");
            ui.checkbox(&mut settings.visualize_canvas, "Visualize Albedo Map");
            ui.checkbox(&mut settings.conservative_rasterization, "Conservative Rasterization");

            if ui.button("Clear Texture").clicked() {
                actions.clear_canvas = true;
            }

            if view.last_hit.is_hit() {
                let p = view.last_hit.position;
                ui.label(format!("Last hit: ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z));
            }

            if let Some(note) = view.conservative_note {
                ui.separator();
                ui.label(note);
            }
        });

    actions
}
