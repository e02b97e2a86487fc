//! Pure state transitions from backend payloads to view state.
//!
//! Every payload is partial: a field that is absent leaves its region of the
//! view untouched.

use lila_shared::{
    domain::{PackageId, WorkspaceName},
    protocol::{ProgressUpdate, SummaryResult, ViewFragment, WarningList},
};

use crate::{
    controller::detail::DetailRequest,
    ui::state::{DetailModalView, ProgressBarView, SummaryView, TableView},
};

/// Clamps a reported percentage into `0.0..=100.0`. NaN counts as 0 and the
/// infinities clamp to the nearest bound.
pub fn clamp_percent(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, 100.0)
}

pub fn apply_fragment(view: &mut SummaryView, fragment: ViewFragment) {
    if let Some(workspaces) = fragment.workspaces {
        view.workspaces = workspaces;
    }
    if let Some(last_workspace) = fragment.last_workspace {
        view.selected_workspace = Some(last_workspace);
    }
    if let Some(table) = fragment.table {
        view.table = Some(TableView::new(table));
    }
}

/// The bar stays visible below 100% and hides once the scan reports exactly
/// 100%. Only the bar width is rounded.
pub fn apply_progress(view: &mut SummaryView, update: ProgressUpdate) {
    if let Some(raw) = update.percent {
        let percent = clamp_percent(raw);
        view.progress.percent = percent.floor() as u8;
        view.progress.visible = percent < 100.0;
    }
    apply_fragment(view, update.fragment);
}

pub fn apply_summary(view: &mut SummaryView, result: SummaryResult) {
    apply_fragment(view, result.fragment);
}

/// Busy: trigger disabled, banner hidden, table cleared until the scan
/// reports a new one.
pub fn begin_check(view: &mut SummaryView) {
    view.check_enabled = false;
    view.outdated_banner = false;
    view.table = None;
    view.progress = ProgressBarView::default();
}

/// The scan's terminal result ends it whether or not 100% was pushed.
pub fn finish_check(view: &mut SummaryView) {
    view.check_enabled = true;
    view.progress.visible = false;
}

/// The shown table belongs to the previous workspace.
pub fn mark_outdated(view: &mut SummaryView) {
    view.table = None;
    view.outdated_banner = true;
}

/// Returns `false` when `name` is already selected.
pub fn select_workspace(view: &mut SummaryView, name: WorkspaceName) -> bool {
    if view.selected_workspace.as_ref() == Some(&name) {
        return false;
    }
    view.selected_workspace = Some(name);
    true
}

/// Package of the selected workspace, used when inspecting a log.
pub fn selected_package(view: &SummaryView) -> Option<PackageId> {
    let selected = view.selected_workspace.as_ref()?;
    view.workspaces
        .iter()
        .find(|entry| &entry.name == selected)
        .map(|entry| entry.package.clone())
}

pub fn open_detail(modal: &mut DetailModalView, generation: u64, request: DetailRequest) {
    modal.open = true;
    modal.loading = true;
    modal.generation = generation;
    modal.request = Some(request);
    modal.rows.clear();
    modal.error = None;
}

/// Replaces the modal rows. Results from another generation are ignored and
/// `false` is returned.
pub fn load_detail(modal: &mut DetailModalView, generation: u64, warnings: WarningList) -> bool {
    if !modal.open || modal.generation != generation {
        return false;
    }
    modal.loading = false;
    modal.error = None;
    modal.rows = warnings.warnings.unwrap_or_default();
    true
}

pub fn fail_detail(modal: &mut DetailModalView, generation: u64, message: String) -> bool {
    if !modal.open || modal.generation != generation {
        return false;
    }
    modal.loading = false;
    modal.rows.clear();
    modal.error = Some(message);
    true
}

pub fn close_detail(modal: &mut DetailModalView) {
    modal.open = false;
    modal.loading = false;
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
