//! View state owned by the UI thread. Mutated only through `ui::render`.

use std::path::PathBuf;

use lila_shared::{
    domain::WorkspaceName,
    protocol::{SummaryTable, TableColumn, WarningRow, WorkspaceEntry},
};

use crate::controller::detail::DetailRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressBarView {
    pub visible: bool,
    pub percent: u8,
}

impl ProgressBarView {
    pub fn fraction(&self) -> f32 {
        f32::from(self.percent) / 100.0
    }
}

/// The rendered summary table. At most one row is expanded at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableView {
    pub table: SummaryTable,
    expanded: Option<usize>,
}

impl TableView {
    pub fn new(table: SummaryTable) -> Self {
        Self {
            table,
            expanded: None,
        }
    }

    pub fn expanded(&self) -> Option<usize> {
        self.expanded
    }

    pub fn is_expanded(&self, row: usize) -> bool {
        self.expanded == Some(row)
    }

    /// Expanding a row collapses whichever row was open before.
    pub fn toggle_row(&mut self, row: usize) {
        if row >= self.table.rows.len() {
            return;
        }
        self.expanded = if self.is_expanded(row) { None } else { Some(row) };
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = (usize, &TableColumn)> + '_ {
        self.table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.visible)
    }

    pub fn hidden_columns(&self) -> impl Iterator<Item = (usize, &TableColumn)> + '_ {
        self.table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| !column.visible)
    }

    pub fn has_hidden_columns(&self) -> bool {
        self.table.columns.iter().any(|column| !column.visible)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryView {
    pub workspaces: Vec<WorkspaceEntry>,
    pub selected_workspace: Option<WorkspaceName>,
    pub table: Option<TableView>,
    pub progress: ProgressBarView,
    pub outdated_banner: bool,
    pub check_enabled: bool,
    pub preloader: bool,
    pub notification: Option<String>,
    pub selected_path: Option<PathBuf>,
}

impl Default for SummaryView {
    fn default() -> Self {
        Self {
            workspaces: Vec::new(),
            selected_workspace: None,
            table: None,
            progress: ProgressBarView::default(),
            outdated_banner: false,
            check_enabled: true,
            preloader: true,
            notification: None,
            selected_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetailModalView {
    pub open: bool,
    pub loading: bool,
    /// Generation of the inspection the modal currently shows.
    pub generation: u64,
    pub request: Option<DetailRequest>,
    pub rows: Vec<WarningRow>,
    pub error: Option<String>,
}
