//! Command-line parsing.
//!
//! Positional words select the command; `--name value` pairs carry its
//! options and `--yes` confirms destructive actions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};

use eduadmin_core::bundle::{BundleForm, BundleType};
use eduadmin_core::ordering::Direction;
use eduadmin_core::row::RowForm;
use eduadmin_core::search::{ColumnFilters, SearchTarget};
use eduadmin_core::types::{DbId, Guid};
use eduadmin_core::voucher::VoucherStatus;

pub const USAGE: &str = "\
Usage: eduadmin <command> [options]

  login <username> <password>
  logout
  whoami

  scope show | clear
  scope select <country> <curriculum> <stage> <grade> [subject]

  bundles list [--page N] [--filter key=value]...
  bundles show <id>
  bundles create --name .. --description .. --price .. [--discount ..]
                 --type Duration|ExpiryDays [--start YYYY-MM-DD --end YYYY-MM-DD]
                 [--expiry-days N] --subjects 1,2 --services 7,8 [--vouchers N]
  bundles toggle <id>
  bundles delete <id> [--yes]
  bundles generate <id> [--count N]
  bundles vouchers <id>

  vouchers list [--bundle <id>] [--status Available|Used|Inactive] [--page N] [--filter ..]
  vouchers lookup <code>
  vouchers toggle <id> [--bundle <id>]
  vouchers set-active <true|false> <id>... [--yes]
  vouchers unused deactivate|delete --bundle <id> [--yes]
  vouchers export [--bundle <id>] [--out <path>]
  vouchers csv [--bundle <id>] [--page N] [--out <path>]

  rows list [--page N] [--filter ..]
  rows create --name .. [--name-en ..] [--description ..] [--description-en ..]
  rows toggle <id>
  rows delete <id> [--yes]
  rows bundles <row>
  rows assign <row> <bundle>...
  rows move <row> <position> up|down
  rows remove <row> <bundle> [--yes]

  subject-services list [--subject <id>]
  subject-services add <service>... [--subject <id>]
  subject-services remove <id> [--subject <id>] [--yes]
";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Login { username: String, password: String },
    Logout,
    Whoami,
    Scope(ScopeCommand),
    Bundles(BundlesCommand),
    Vouchers(VouchersCommand),
    Rows(RowsCommand),
    SubjectServices(SubjectServicesCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeCommand {
    Show,
    Clear,
    /// Ids from country down to grade, optionally followed by a subject.
    Select { ids: Vec<DbId> },
}

/// Page and column filters shared by the list commands.
#[derive(Debug, Clone, PartialEq)]
pub struct ListArgs {
    pub page: u32,
    pub filters: ColumnFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BundlesCommand {
    List(ListArgs),
    Show { id: Guid },
    Create { form: BundleForm },
    Toggle { id: Guid },
    Delete { id: Guid, yes: bool },
    Generate { id: Guid, count: Option<u32> },
    Vouchers { id: Guid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKind {
    Deactivate,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VouchersCommand {
    List {
        list: ListArgs,
        bundle: Option<Guid>,
        status: Option<VoucherStatus>,
    },
    Lookup { code: String },
    Toggle { id: Guid, bundle: Option<Guid> },
    SetActive { is_active: bool, ids: Vec<Guid>, yes: bool },
    Unused { kind: UnusedKind, bundle: Guid, yes: bool },
    Export { bundle: Option<Guid>, out: Option<PathBuf> },
    Csv { bundle: Option<Guid>, page: u32, out: Option<PathBuf> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowsCommand {
    List(ListArgs),
    Create { form: RowForm },
    Toggle { id: DbId },
    Delete { id: DbId, yes: bool },
    Bundles { row: DbId },
    Assign { row: DbId, bundles: Vec<Guid> },
    /// `position` is 1-based as printed by `rows bundles`.
    Move { row: DbId, position: usize, direction: Direction },
    Remove { row: DbId, bundle: Guid, yes: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectServicesCommand {
    List { subject: Option<DbId> },
    Add { subject: Option<DbId>, services: Vec<DbId> },
    Remove { subject: Option<DbId>, id: DbId, yes: bool },
}

// ---------------------------------------------------------------------------
// Tokenizing
// ---------------------------------------------------------------------------

const SWITCHES: &[&str] = &["yes"];

/// Options that may be given more than once.
const REPEATED: &[&str] = &["filter"];

#[derive(Debug, Default)]
struct Parsed {
    words: Vec<String>,
    options: HashMap<String, Vec<String>>,
    switches: Vec<String>,
}

impl Parsed {
    fn split(args: &[String]) -> anyhow::Result<Self> {
        let mut parsed = Parsed::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let Some(name) = arg.strip_prefix("--") else {
                parsed.words.push(arg.clone());
                continue;
            };
            if SWITCHES.contains(&name) {
                parsed.switches.push(name.to_string());
                continue;
            }
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("Option --{name} needs a value"))?;
            let values = parsed.options.entry(name.to_string()).or_default();
            if !values.is_empty() && !REPEATED.contains(&name) {
                bail!("Option --{name} given more than once");
            }
            values.push(value.clone());
        }
        Ok(parsed)
    }

    fn switch(&self, name: &str) -> bool {
        self.switches.iter().any(|s| s == name)
    }

    fn option(&self, name: &str) -> Option<&str> {
        self.options
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    fn text(&self, name: &str) -> String {
        self.option(name).unwrap_or_default().to_string()
    }

    fn parsed<T: FromStr>(&self, name: &str) -> anyhow::Result<Option<T>> {
        self.option(name)
            .map(|raw| {
                raw.parse()
                    .map_err(|_| anyhow!("Invalid value '{raw}' for --{name}"))
            })
            .transpose()
    }

    fn page(&self) -> anyhow::Result<u32> {
        Ok(self.parsed::<u32>("page")?.unwrap_or(1).max(1))
    }

    fn list(&self, target: SearchTarget) -> anyhow::Result<ListArgs> {
        let mut filters = ColumnFilters::new();
        for expr in self.options.get("filter").into_iter().flatten() {
            filters.apply(target, expr)?;
        }
        Ok(ListArgs {
            page: self.page()?,
            filters,
        })
    }

    fn only(&self, allowed: &[&str]) -> anyhow::Result<()> {
        for name in self.options.keys() {
            if !allowed.contains(&name.as_str()) {
                bail!("Unknown option --{name}");
            }
        }
        Ok(())
    }
}

fn positional<T: FromStr>(words: &[String], index: usize, what: &str) -> anyhow::Result<T> {
    let raw = words
        .get(index)
        .ok_or_else(|| anyhow!("Missing {what}"))?;
    raw.parse()
        .map_err(|_| anyhow!("Invalid {what} '{raw}'"))
}

fn id_list<T: FromStr>(raw: &str, what: &str) -> anyhow::Result<Vec<T>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(|_| anyhow!("Invalid {what} '{s}'")))
        .collect()
}

fn guid_option(parsed: &Parsed, name: &str) -> anyhow::Result<Option<Guid>> {
    parsed.parsed::<Guid>(name)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Parse the arguments after the program name.
pub fn parse(args: &[String]) -> anyhow::Result<Command> {
    let parsed = Parsed::split(args)?;
    let words = &parsed.words;
    let Some(group) = words.first() else {
        return Ok(Command::Help);
    };
    let action = words.get(1).map(String::as_str);
    let rest = words.get(2..).unwrap_or_default();

    match group.as_str() {
        "help" | "-h" => Ok(Command::Help),
        "login" => {
            parsed.only(&[])?;
            Ok(Command::Login {
                username: positional(words, 1, "username")?,
                password: positional(words, 2, "password")?,
            })
        }
        "logout" => Ok(Command::Logout),
        "whoami" => Ok(Command::Whoami),
        "scope" => parse_scope(action, rest).map(Command::Scope),
        "bundles" => parse_bundles(action, rest, &parsed).map(Command::Bundles),
        "vouchers" => parse_vouchers(action, rest, &parsed).map(Command::Vouchers),
        "rows" => parse_rows(action, rest, &parsed).map(Command::Rows),
        "subject-services" => {
            parse_subject_services(action, rest, &parsed).map(Command::SubjectServices)
        }
        other => bail!("Unknown command '{other}'"),
    }
}

fn parse_scope(action: Option<&str>, rest: &[String]) -> anyhow::Result<ScopeCommand> {
    match action {
        None | Some("show") => Ok(ScopeCommand::Show),
        Some("clear") => Ok(ScopeCommand::Clear),
        Some("select") => {
            if !(4..=5).contains(&rest.len()) {
                bail!("scope select needs country, curriculum, stage and grade ids, and optionally a subject id");
            }
            let ids = rest
                .iter()
                .map(|raw| raw.parse().with_context(|| format!("Invalid id '{raw}'")))
                .collect::<anyhow::Result<Vec<DbId>>>()?;
            Ok(ScopeCommand::Select { ids })
        }
        Some(other) => bail!("Unknown scope action '{other}'"),
    }
}

fn parse_bundles(
    action: Option<&str>,
    rest: &[String],
    parsed: &Parsed,
) -> anyhow::Result<BundlesCommand> {
    match action {
        None | Some("list") => {
            parsed.only(&["page", "filter"])?;
            Ok(BundlesCommand::List(parsed.list(SearchTarget::Bundles)?))
        }
        Some("show") => Ok(BundlesCommand::Show {
            id: positional(rest, 0, "bundle id")?,
        }),
        Some("create") => Ok(BundlesCommand::Create {
            form: bundle_form(parsed)?,
        }),
        Some("toggle") => Ok(BundlesCommand::Toggle {
            id: positional(rest, 0, "bundle id")?,
        }),
        Some("delete") => Ok(BundlesCommand::Delete {
            id: positional(rest, 0, "bundle id")?,
            yes: parsed.switch("yes"),
        }),
        Some("generate") => {
            parsed.only(&["count"])?;
            Ok(BundlesCommand::Generate {
                id: positional(rest, 0, "bundle id")?,
                count: parsed.parsed("count")?,
            })
        }
        Some("vouchers") => Ok(BundlesCommand::Vouchers {
            id: positional(rest, 0, "bundle id")?,
        }),
        Some(other) => bail!("Unknown bundles action '{other}'"),
    }
}

fn bundle_form(parsed: &Parsed) -> anyhow::Result<BundleForm> {
    parsed.only(&[
        "name",
        "name-en",
        "description",
        "description-en",
        "image-url",
        "price",
        "discount",
        "type",
        "expiry-days",
        "start",
        "end",
        "vouchers",
        "subjects",
        "services",
    ])?;
    let defaults = BundleForm::default();
    let bundle_type = match parsed.option("type") {
        Some(raw) => BundleType::parse(raw)?,
        None => defaults.bundle_type,
    };
    Ok(BundleForm {
        name: parsed.text("name"),
        name_en: parsed.text("name-en"),
        description: parsed.text("description"),
        description_en: parsed.text("description-en"),
        image_url: parsed.text("image-url"),
        price: parsed.text("price"),
        discount: parsed
            .option("discount")
            .map_or(defaults.discount, str::to_string),
        bundle_type,
        expiry_days: parsed.text("expiry-days"),
        start_at: parsed.text("start"),
        expire_at: parsed.text("end"),
        voucher_count: parsed
            .option("vouchers")
            .map_or(defaults.voucher_count, str::to_string),
        subject_ids: id_list(parsed.option("subjects").unwrap_or_default(), "subject id")?,
        service_ids: id_list(parsed.option("services").unwrap_or_default(), "service id")?,
    })
}

fn parse_vouchers(
    action: Option<&str>,
    rest: &[String],
    parsed: &Parsed,
) -> anyhow::Result<VouchersCommand> {
    match action {
        None | Some("list") => {
            parsed.only(&["page", "filter", "bundle", "status"])?;
            Ok(VouchersCommand::List {
                list: parsed.list(SearchTarget::Vouchers)?,
                bundle: guid_option(parsed, "bundle")?,
                status: parsed.option("status").map(VoucherStatus::parse).transpose()?,
            })
        }
        Some("lookup") => Ok(VouchersCommand::Lookup {
            code: positional(rest, 0, "voucher code")?,
        }),
        Some("toggle") => Ok(VouchersCommand::Toggle {
            id: positional(rest, 0, "voucher id")?,
            bundle: guid_option(parsed, "bundle")?,
        }),
        Some("set-active") => {
            let is_active: bool = positional(rest, 0, "true/false flag")?;
            let ids = rest[1..]
                .iter()
                .map(|raw| raw.parse().map_err(|_| anyhow!("Invalid voucher id '{raw}'")))
                .collect::<anyhow::Result<Vec<Guid>>>()?;
            Ok(VouchersCommand::SetActive {
                is_active,
                ids,
                yes: parsed.switch("yes"),
            })
        }
        Some("unused") => {
            let kind = match rest.first().map(String::as_str) {
                Some("deactivate") => UnusedKind::Deactivate,
                Some("delete") => UnusedKind::Delete,
                _ => bail!("vouchers unused needs 'deactivate' or 'delete'"),
            };
            let bundle = guid_option(parsed, "bundle")?
                .ok_or_else(|| anyhow!("vouchers unused needs --bundle"))?;
            Ok(VouchersCommand::Unused {
                kind,
                bundle,
                yes: parsed.switch("yes"),
            })
        }
        Some("export") => {
            parsed.only(&["bundle", "out"])?;
            Ok(VouchersCommand::Export {
                bundle: guid_option(parsed, "bundle")?,
                out: parsed.option("out").map(PathBuf::from),
            })
        }
        Some("csv") => {
            parsed.only(&["bundle", "page", "out"])?;
            Ok(VouchersCommand::Csv {
                bundle: guid_option(parsed, "bundle")?,
                page: parsed.page()?,
                out: parsed.option("out").map(PathBuf::from),
            })
        }
        Some(other) => bail!("Unknown vouchers action '{other}'"),
    }
}

fn parse_rows(
    action: Option<&str>,
    rest: &[String],
    parsed: &Parsed,
) -> anyhow::Result<RowsCommand> {
    match action {
        None | Some("list") => {
            parsed.only(&["page", "filter"])?;
            Ok(RowsCommand::List(parsed.list(SearchTarget::Rows)?))
        }
        Some("create") => {
            parsed.only(&["name", "name-en", "description", "description-en"])?;
            Ok(RowsCommand::Create {
                form: RowForm {
                    name: parsed.text("name"),
                    name_en: parsed.text("name-en"),
                    description: parsed.text("description"),
                    description_en: parsed.text("description-en"),
                },
            })
        }
        Some("toggle") => Ok(RowsCommand::Toggle {
            id: positional(rest, 0, "row id")?,
        }),
        Some("delete") => Ok(RowsCommand::Delete {
            id: positional(rest, 0, "row id")?,
            yes: parsed.switch("yes"),
        }),
        Some("bundles") => Ok(RowsCommand::Bundles {
            row: positional(rest, 0, "row id")?,
        }),
        Some("assign") => {
            let row = positional(rest, 0, "row id")?;
            let bundles = rest[1..]
                .iter()
                .map(|raw| raw.parse().map_err(|_| anyhow!("Invalid bundle id '{raw}'")))
                .collect::<anyhow::Result<Vec<Guid>>>()?;
            Ok(RowsCommand::Assign { row, bundles })
        }
        Some("move") => {
            let direction: String = positional(rest, 2, "direction")?;
            Ok(RowsCommand::Move {
                row: positional(rest, 0, "row id")?,
                position: positional(rest, 1, "position")?,
                direction: Direction::parse(&direction)?,
            })
        }
        Some("remove") => Ok(RowsCommand::Remove {
            row: positional(rest, 0, "row id")?,
            bundle: positional(rest, 1, "bundle id")?,
            yes: parsed.switch("yes"),
        }),
        Some(other) => bail!("Unknown rows action '{other}'"),
    }
}

fn parse_subject_services(
    action: Option<&str>,
    rest: &[String],
    parsed: &Parsed,
) -> anyhow::Result<SubjectServicesCommand> {
    parsed.only(&["subject"])?;
    let subject = parsed.parsed::<DbId>("subject")?;
    match action {
        None | Some("list") => Ok(SubjectServicesCommand::List { subject }),
        Some("add") => {
            let services = rest
                .iter()
                .map(|raw| raw.parse().map_err(|_| anyhow!("Invalid service id '{raw}'")))
                .collect::<anyhow::Result<Vec<DbId>>>()?;
            Ok(SubjectServicesCommand::Add { subject, services })
        }
        Some("remove") => Ok(SubjectServicesCommand::Remove {
            subject,
            id: positional(rest, 0, "subject service id")?,
            yes: parsed.switch("yes"),
        }),
        Some(other) => bail!("Unknown subject-services action '{other}'"),
    }
}
