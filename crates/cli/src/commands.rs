//! Command execution against the backend.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::NaiveDate;

use eduadmin_client::api::ApiClient;
use eduadmin_client::assignment::AssignmentWorkflow;
use eduadmin_client::collection::{Collection, CollectionBackend, CollectionOptions};
use eduadmin_client::config::ClientConfig;
use eduadmin_client::error::ClientError;
use eduadmin_client::screens::bundles::BundlesScreen;
use eduadmin_client::screens::rows::RowsScreen;
use eduadmin_client::screens::subject_services::SubjectServicesScreen;
use eduadmin_client::screens::vouchers::{UnusedAction, VouchersScreen};
use eduadmin_client::selector::CascadingSelector;
use eduadmin_client::session::Session;
use eduadmin_client::storage::{FileStorage, Storage};
use eduadmin_core::bundle::{format_price, Bundle, BundleTerm};
use eduadmin_core::filter::{FilterLevel, SelectorVariant};
use eduadmin_core::form::Confirmation;
use eduadmin_core::row::Row;
use eduadmin_core::search::Pagination;
use eduadmin_core::types::DbId;
use eduadmin_core::voucher::VoucherRow;

use crate::args::{
    BundlesCommand, Command, ListArgs, RowsCommand, ScopeCommand, SubjectServicesCommand,
    UnusedKind, VouchersCommand, USAGE,
};

/// Everything a command needs: configuration and a signed-in (or not)
/// API client.
pub struct App {
    config: ClientConfig,
    api: ApiClient,
}

impl App {
    /// Session state is read from, and written to, `config.state_dir`.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(&config.state_dir));
        let session = Arc::new(Session::load(storage));
        let api = ApiClient::new(&config, session)?;
        Ok(Self { config, api })
    }

    fn options(&self) -> CollectionOptions {
        CollectionOptions {
            page_size: self.config.default_page_size,
            debounce: self.config.filter_debounce(),
            ..CollectionOptions::default()
        }
    }

    fn grade_id(&self) -> Option<DbId> {
        self.api.session().scope().grade_id()
    }

    fn require_grade(&self) -> anyhow::Result<DbId> {
        self.grade_id()
            .context("No scope selected. Run `eduadmin scope select ...` first")
    }

    pub async fn run(&self, command: Command, out: &mut dyn Write) -> anyhow::Result<()> {
        match command {
            Command::Help => write!(out, "{USAGE}")?,
            Command::Login { username, password } => {
                let user = self.api.login(&username, &password).await?;
                writeln!(
                    out,
                    "Signed in as {}",
                    user.username.as_deref().unwrap_or(&username)
                )?;
            }
            Command::Logout => {
                self.api.logout().await?;
                writeln!(out, "Signed out")?;
            }
            Command::Whoami => {
                if !self.api.session().is_authenticated() {
                    bail!("Not signed in");
                }
                let user = self.api.me().await?;
                writeln!(
                    out,
                    "{} ({})",
                    user.username.as_deref().unwrap_or("unknown"),
                    user.role.as_deref().unwrap_or("no role")
                )?;
            }
            Command::Scope(command) => self.scope(command, out).await?,
            Command::Bundles(command) => self.bundles(command, out).await?,
            Command::Vouchers(command) => self.vouchers(command, out).await?,
            Command::Rows(command) => self.rows(command, out).await?,
            Command::SubjectServices(command) => self.subject_services(command, out).await?,
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Scope
    // -----------------------------------------------------------------------

    async fn scope(&self, command: ScopeCommand, out: &mut dyn Write) -> anyhow::Result<()> {
        let context = self.api.session().scope();
        match command {
            ScopeCommand::Show => match context.current() {
                Some(scope) => writeln!(out, "{}", scope.breadcrumb())?,
                None => writeln!(out, "No scope selected")?,
            },
            ScopeCommand::Clear => {
                context.clear_subject()?;
                writeln!(out, "Scope cleared")?;
            }
            ScopeCommand::Select { ids } => {
                let variant = if ids.len() > FilterLevel::Grade.index() + 1 {
                    SelectorVariant::SubjectScope
                } else {
                    SelectorVariant::GradeScope
                };
                let mut selector = CascadingSelector::new(self.api.clone(), variant);
                selector.open(None).await;
                for (level, id) in FilterLevel::ALL.into_iter().zip(ids) {
                    if let Some(message) = selector.error() {
                        bail!("{message}");
                    }
                    selector.select(level, Some(id)).await?;
                }
                let scope = selector.apply(context)?;
                writeln!(out, "Scope set to {}", scope.breadcrumb())?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bundles
    // -----------------------------------------------------------------------

    async fn bundles(&self, command: BundlesCommand, out: &mut dyn Write) -> anyhow::Result<()> {
        let mut screen = BundlesScreen::new(self.api.clone(), self.options());
        match command {
            BundlesCommand::List(list) => {
                load_list(screen.collection_mut(), self.grade_id(), &list).await?;
                for bundle in screen.collection().items() {
                    writeln!(out, "{}", bundle_line(bundle))?;
                }
                let stats = screen.stats();
                writeln!(
                    out,
                    "{} bundles ({} active, {} inactive), total value {}",
                    stats.activation.total,
                    stats.activation.active,
                    stats.activation.inactive,
                    stats.total_value_display()
                )?;
                writeln!(out, "{}", page_footer(screen.collection().pagination()))?;
            }
            BundlesCommand::Show { id } => {
                let bundle = screen.detail(id).await?;
                writeln!(out, "{}", bundle_line(&bundle))?;
                if let Some(description) = bundle.description.as_deref() {
                    writeln!(out, "  {description}")?;
                }
                writeln!(out, "  term: {}", term_label(&bundle))?;
                for ss in &bundle.subject_services {
                    writeln!(
                        out,
                        "  - {} / {}",
                        ss.subject_name.as_deref().unwrap_or("?"),
                        ss.service_name.as_deref().unwrap_or("?")
                    )?;
                }
            }
            BundlesCommand::Create { form } => {
                screen.collection_mut().set_grade(self.grade_id());
                screen.create(&form).await?;
                writeln!(out, "Bundle '{}' created", form.name.trim())?;
            }
            BundlesCommand::Toggle { id } => {
                screen.open().await?;
                let is_active = screen.toggle_active(id).await?;
                writeln!(out, "Bundle {id} is now {}", active_label(is_active))?;
            }
            BundlesCommand::Delete { id, yes } => {
                screen.open().await?;
                let confirmation = screen.request_delete(id)?;
                confirmed(&confirmation, yes)?;
                screen.delete(confirmation).await?;
                writeln!(out, "Bundle {id} deleted")?;
            }
            BundlesCommand::Generate { id, count } => {
                screen.generate_vouchers(id, count).await?;
                writeln!(out, "Vouchers generated for bundle {id}")?;
            }
            BundlesCommand::Vouchers { id } => {
                for voucher in screen.vouchers(id).await? {
                    writeln!(out, "{}\t{}", voucher.code, voucher.status())?;
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Vouchers
    // -----------------------------------------------------------------------

    async fn vouchers(&self, command: VouchersCommand, out: &mut dyn Write) -> anyhow::Result<()> {
        let mut screen = VouchersScreen::new(self.api.clone(), self.options());
        if let VouchersCommand::Lookup { code } = &command {
            let voucher = screen.lookup(code).await?;
            writeln!(out, "{}\t{}\t{}", voucher.code, voucher.status(), voucher.bundle_id)?;
            return Ok(());
        }

        self.require_grade()?;
        screen.open().await?;
        if screen.bundles().is_empty() {
            writeln!(out, "The selected grade has no bundles")?;
            return Ok(());
        }

        match command {
            VouchersCommand::Lookup { .. } => {}
            VouchersCommand::List {
                list,
                bundle,
                status,
            } => {
                if bundle.is_some() {
                    screen.select_bundle(bundle).await?;
                }
                if status.is_some() {
                    screen.filter_status(status).await?;
                }
                if !list.filters.is_empty() {
                    screen.collection_mut().apply_filters(list.filters).await?;
                }
                if list.page > 1 {
                    screen.collection_mut().set_page(list.page);
                    screen.reload().await?;
                }
                for row in screen.collection().items() {
                    writeln!(out, "{}", voucher_line(row))?;
                }
                let stats = screen.stats();
                writeln!(
                    out,
                    "{} vouchers: {} available, {} used, {} inactive",
                    stats.total, stats.available, stats.used, stats.inactive
                )?;
                writeln!(out, "{}", page_footer(screen.collection().pagination()))?;
            }
            VouchersCommand::Toggle { id, bundle } => {
                if bundle.is_some() {
                    screen.select_bundle(bundle).await?;
                }
                let is_active = screen.toggle_active(id).await?;
                writeln!(out, "Voucher {id} is now {}", active_label(is_active))?;
            }
            VouchersCommand::SetActive {
                is_active,
                ids,
                yes,
            } => {
                for id in ids {
                    screen.toggle_selection(id)?;
                }
                let confirmation = screen.request_bulk_set_active(is_active)?;
                confirmed(&confirmation, yes)?;
                let count = confirmation.action().voucher_ids.len();
                screen.bulk_set_active(confirmation).await?;
                writeln!(out, "{count} voucher(s) now {}", active_label(is_active))?;
            }
            VouchersCommand::Unused { kind, bundle, yes } => {
                screen.select_bundle(Some(bundle)).await?;
                let action = match kind {
                    UnusedKind::Deactivate => UnusedAction::Deactivate,
                    UnusedKind::Delete => UnusedAction::Delete,
                };
                let confirmation = screen.request_unused(action)?;
                confirmed(&confirmation, yes)?;
                screen.run_unused(confirmation).await?;
                writeln!(out, "Done")?;
            }
            VouchersCommand::Export { bundle, out: path } => {
                if bundle.is_some() {
                    screen.select_bundle(bundle).await?;
                }
                let (name, bytes) = screen.export(today()).await?;
                let path = save(path, &name, &bytes)?;
                writeln!(out, "Saved {} bytes to {}", bytes.len(), path.display())?;
            }
            VouchersCommand::Csv {
                bundle,
                page,
                out: path,
            } => {
                if bundle.is_some() {
                    screen.select_bundle(bundle).await?;
                }
                if page > 1 {
                    screen.collection_mut().set_page(page);
                    screen.reload().await?;
                }
                let (name, bytes) = screen.page_csv(today())?;
                let path = save(path, &name, &bytes)?;
                writeln!(out, "Saved {} vouchers to {}", screen.collection().items().len(), path.display())?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Rows
    // -----------------------------------------------------------------------

    async fn rows(&self, command: RowsCommand, out: &mut dyn Write) -> anyhow::Result<()> {
        let mut screen = RowsScreen::new(self.api.clone(), self.options());
        match command {
            RowsCommand::List(list) => {
                load_list(screen.collection_mut(), self.grade_id(), &list).await?;
                for row in screen.collection().items() {
                    writeln!(out, "{}", row_line(row))?;
                }
                let stats = screen.stats();
                writeln!(
                    out,
                    "{} rows ({} active, {} inactive)",
                    stats.total, stats.active, stats.inactive
                )?;
                writeln!(out, "{}", page_footer(screen.collection().pagination()))?;
            }
            RowsCommand::Create { form } => {
                screen.collection_mut().set_grade(self.grade_id());
                screen.create(&form).await?;
                writeln!(out, "Row '{}' created", form.name.trim())?;
            }
            RowsCommand::Toggle { id } => {
                screen.open().await?;
                let is_active = screen.toggle_active(id).await?;
                writeln!(out, "Row {id} is now {}", active_label(is_active))?;
            }
            RowsCommand::Delete { id, yes } => {
                screen.open().await?;
                let confirmation = screen.request_delete(id)?;
                confirmed(&confirmation, yes)?;
                screen.delete(confirmation).await?;
                writeln!(out, "Row {id} deleted")?;
            }
            RowsCommand::Bundles { row } => {
                let workflow = screen.open_assignment(row).await?;
                print_assignments(&workflow, out)?;
            }
            RowsCommand::Assign { row, bundles } => {
                let mut workflow = screen.open_assignment(row).await?;
                for bundle in bundles {
                    workflow.toggle(bundle)?;
                }
                workflow.assign().await?;
                print_assignments(&workflow, out)?;
            }
            RowsCommand::Move {
                row,
                position,
                direction,
            } => {
                let mut workflow = screen.open_assignment(row).await?;
                if position == 0 || !workflow.move_item(position - 1, direction) {
                    bail!("Cannot move the bundle at position {position}");
                }
                workflow.save_order().await?;
                print_assignments(&workflow, out)?;
            }
            RowsCommand::Remove { row, bundle, yes } => {
                let mut workflow = screen.open_assignment(row).await?;
                let confirmation = workflow.request_remove(bundle)?;
                confirmed(&confirmation, yes)?;
                workflow.remove(confirmation).await?;
                print_assignments(&workflow, out)?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Subject services
    // -----------------------------------------------------------------------

    async fn subject_services(
        &self,
        command: SubjectServicesCommand,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        self.require_grade()?;
        let mut screen = SubjectServicesScreen::new(self.api.clone());
        screen.open().await?;

        let subject = match &command {
            SubjectServicesCommand::List { subject }
            | SubjectServicesCommand::Add { subject, .. }
            | SubjectServicesCommand::Remove { subject, .. } => *subject,
        };
        if let Some(subject_id) = subject {
            screen.select_subject(subject_id).await?;
        }
        if screen.subject_id().is_none() {
            bail!("The selected grade has no subjects");
        }

        match command {
            SubjectServicesCommand::List { .. } => {
                for item in screen.items() {
                    writeln!(
                        out,
                        "{}\t{}",
                        item.id,
                        item.service_name.as_deref().unwrap_or("?")
                    )?;
                }
            }
            SubjectServicesCommand::Add { services, .. } => {
                for service_id in services {
                    screen.toggle_service(service_id)?;
                }
                screen.create().await?;
                writeln!(out, "Subject now has {} service(s)", screen.items().len())?;
            }
            SubjectServicesCommand::Remove { id, yes, .. } => {
                let confirmation = screen.request_delete(id)?;
                confirmed(&confirmation, yes)?;
                screen.delete(confirmation).await?;
                writeln!(out, "Subject service {id} removed")?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch the requested page with the given column filters.
async fn load_list<B: CollectionBackend>(
    collection: &mut Collection<B>,
    grade_id: Option<DbId>,
    list: &ListArgs,
) -> Result<(), ClientError> {
    collection.set_grade(grade_id);
    let fetched = collection.apply_filters(list.filters.clone()).await?;
    if !fetched || list.page > 1 {
        collection.set_page(list.page);
        collection.refresh().await?;
    }
    Ok(())
}

/// Destructive actions need `--yes`.
fn confirmed<A>(confirmation: &Confirmation<A>, yes: bool) -> anyhow::Result<()> {
    if !yes {
        bail!("{} Re-run with --yes to confirm.", confirmation.prompt());
    }
    Ok(())
}

fn print_assignments<B>(workflow: &AssignmentWorkflow<B>, out: &mut dyn Write) -> anyhow::Result<()>
where
    B: eduadmin_client::assignment::RowBundleBackend,
{
    if workflow.assigned().is_empty() {
        writeln!(out, "No bundles assigned to row {}", workflow.row_id())?;
    }
    for (index, assignment) in workflow.assigned().iter().enumerate() {
        let name = assignment
            .name_en
            .as_deref()
            .or(assignment.name.as_deref())
            .unwrap_or("?");
        writeln!(out, "{}. {name}\t{}", index + 1, assignment.bundle_id)?;
    }
    Ok(())
}

fn save(path: Option<PathBuf>, default_name: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    let path = path.unwrap_or_else(|| Path::new(default_name).to_path_buf());
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn active_label(is_active: bool) -> &'static str {
    if is_active {
        "active"
    } else {
        "inactive"
    }
}

pub fn bundle_line(bundle: &Bundle) -> String {
    format!(
        "{}\t{}\t{} ({}% off: {})\t{}",
        bundle.id,
        bundle.display_name(),
        format_price(bundle.price),
        bundle.discount,
        format_price(bundle.final_price()),
        active_label(bundle.is_active)
    )
}

pub fn term_label(bundle: &Bundle) -> String {
    match bundle.term() {
        Some(BundleTerm::Duration {
            start_at,
            expire_at,
        }) => format!("{start_at} to {expire_at}"),
        Some(BundleTerm::ExpiryDays(days)) => format!("{days} days after activation"),
        None => format!("{} (incomplete)", bundle.bundle_type.as_str()),
    }
}

pub fn row_line(row: &Row) -> String {
    format!("{}\t{}\t{}", row.id, row.display_name(), active_label(row.is_active))
}

pub fn voucher_line(row: &VoucherRow) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        row.voucher.id, row.voucher.code, row.bundle_name, row.status
    )
}

pub fn page_footer(pagination: Pagination) -> String {
    format!(
        "page {} of {} ({} records)",
        pagination.current_page,
        pagination.total_pages.max(1),
        pagination.total_records
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundle(value: serde_json::Value) -> Bundle {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_bundle_line_shows_discounted_price() {
        let b = bundle(json!({
            "id": "0d0c8f3e-7b6a-4b53-8f1e-6a3f0c2b9d10",
            "name": "Math",
            "price": 100.0,
            "discount": 10,
            "is_active": true,
        }));
        assert_eq!(
            bundle_line(&b),
            "0d0c8f3e-7b6a-4b53-8f1e-6a3f0c2b9d10\tMath\t100.00 (10% off: 90.00)\tactive"
        );
    }

    #[test]
    fn test_term_label() {
        let days = bundle(json!({
            "id": "0d0c8f3e-7b6a-4b53-8f1e-6a3f0c2b9d10",
            "name": "Math",
            "price": 1.0,
            "type": "ExpiryDays",
            "expiryDays": 30,
        }));
        assert_eq!(term_label(&days), "30 days after activation");

        let incomplete = bundle(json!({
            "id": "0d0c8f3e-7b6a-4b53-8f1e-6a3f0c2b9d10",
            "name": "Math",
            "price": 1.0,
            "type": "Duration",
        }));
        assert_eq!(term_label(&incomplete), "Duration (incomplete)");
    }

    #[test]
    fn test_page_footer_never_shows_zero_pages() {
        assert_eq!(page_footer(Pagination::default()), "page 0 of 1 (0 records)");
    }

    #[test]
    fn test_confirmation_required() {
        let confirmation = Confirmation::new("Delete row 'Featured'?", 3);
        let err = confirmed(&confirmation, false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Delete row 'Featured'? Re-run with --yes to confirm."
        );
        assert!(confirmed(&confirmation, true).is_ok());
    }
}
