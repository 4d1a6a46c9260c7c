use std::{
    fs::File,
    io::{self, BufWriter},
    path::PathBuf,
    process::exit,
    time::Duration,
};

use clap::{Args, Parser, Subcommand};

use tally::{
    ApiClient, CATEGORIES, Config, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TIMEZONE,
    Error, NewTransaction, RegistrationForm, SessionController, Transaction, TransactionFilter,
    TransactionId, TransactionType, YearMonth, available_months, create_transaction,
    current_month, default_token_path, delete_transactions, export_filename, format_currency,
    get_budget, get_transaction, get_transactions, set_budget, setup_logging, summarize, today,
    totals, update_transaction, write_transactions_csv,
};
use time::Date;

/// Track income, expenses and a monthly budget from the command line.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The base URL of the Tally backend.
    #[arg(long, env = "TALLY_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// The file the session tokens are kept in.
    ///
    /// Defaults to `tally/tokens.json` in the user's config directory.
    #[arg(long, env = "TALLY_TOKEN_FILE", global = true)]
    token_file: Option<PathBuf>,

    /// The canonical timezone that decides the current date, e.g. "Asia/Manila".
    #[arg(long, env = "TALLY_TIMEZONE", default_value = DEFAULT_TIMEZONE, global = true)]
    timezone: String,

    /// Seconds to wait for each response.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs(), global = true)]
    timeout: u64,

    /// Log each request and response.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also append debug logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and keep the session for later commands.
    Login {
        /// The email address of the account.
        #[arg(long)]
        email: String,
    },
    /// Create an account. Does not log in.
    Register {
        /// The display name for the account.
        #[arg(long)]
        username: String,
        /// The email address to log in with.
        #[arg(long)]
        email: String,
    },
    /// End the session.
    Logout,
    /// Show the logged in user.
    Whoami,
    /// List, add, change and remove transactions.
    #[command(subcommand)]
    Transactions(TransactionsCommand),
    /// Show or set the monthly budget.
    #[command(subcommand)]
    Budget(BudgetCommand),
    /// Show the totals, spending by category and budget for a month.
    Dashboard {
        /// The month to show as YYYY-MM. Defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },
    /// Save transactions as CSV.
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// The directory to save into, or "-" for stdout.
        #[arg(long, default_value = ".")]
        output: String,
    },
}

#[derive(Subcommand, Debug)]
enum TransactionsCommand {
    /// List transactions.
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show one transaction.
    Show {
        /// The transaction ID.
        id: TransactionId,
    },
    /// Record a new transaction.
    Add {
        /// What the transaction was for.
        #[arg(long)]
        subject: String,
        /// How much money moved.
        #[arg(long)]
        amount: f64,
        /// Income or Expense.
        #[arg(long = "type", default_value = "Expense")]
        kind: String,
        /// The spending category. Incomes are always filed under Other.
        #[arg(long, default_value = tally::DEFAULT_CATEGORY)]
        category: String,
        /// The date as YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        date: Option<String>,
        /// Free-form notes.
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Change a transaction. Fields that are not given keep their value.
    Edit {
        /// The transaction ID.
        id: TransactionId,
        #[command(flatten)]
        changes: TransactionChanges,
    },
    /// Delete one or more transactions.
    Delete {
        /// The transaction IDs.
        #[arg(required = true)]
        ids: Vec<TransactionId>,
    },
}

#[derive(Subcommand, Debug)]
enum BudgetCommand {
    /// Show the budget for a month.
    Show {
        /// The month as YYYY-MM. Defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },
    /// Set the budget for a month, replacing any existing one.
    Set {
        /// The most to spend in the month.
        amount: f64,
        /// The month as YYYY-MM. Defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
struct TransactionChanges {
    /// The new subject.
    #[arg(long)]
    subject: Option<String>,
    /// The new amount.
    #[arg(long)]
    amount: Option<f64>,
    /// The new type, Income or Expense.
    #[arg(long = "type")]
    kind: Option<String>,
    /// The new category.
    #[arg(long)]
    category: Option<String>,
    /// The new date as YYYY-MM-DD.
    #[arg(long)]
    date: Option<String>,
    /// The new notes.
    #[arg(long)]
    notes: Option<String>,
}

impl TransactionChanges {
    /// The replacement for `current` with these changes made.
    ///
    /// The type is changed before the category, so an income turned into an
    /// expense keeps the category given alongside it.
    fn apply(self, current: &Transaction) -> Result<NewTransaction, Error> {
        let mut update = NewTransaction::from(current);

        if let Some(kind) = self.kind {
            update = update.kind(kind.parse::<TransactionType>()?);
        }
        if let Some(category) = self.category {
            warn_unknown_category(&category);
            update = update.category(&category);
        }
        if let Some(subject) = self.subject {
            update.subject = subject;
        }
        if let Some(amount) = self.amount {
            update.amount = amount;
        }
        if let Some(date) = self.date {
            update.date = parse_date(&date)?;
        }
        if let Some(notes) = self.notes {
            update = update.notes(&notes);
        }

        Ok(update)
    }
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Only transactions of this type, or "All".
    #[arg(long = "type")]
    kind: Option<String>,
    /// Only transactions in this category, or "All".
    #[arg(long)]
    category: Option<String>,
    /// Only transactions in this month (YYYY-MM), or "All".
    #[arg(long)]
    month: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> Result<TransactionFilter, Error> {
        Ok(TransactionFilter::parse(
            self.kind.as_deref(),
            self.category.as_deref(),
            self.month.as_deref(),
        )?)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(error) = setup_logging(cli.verbose, cli.log_file.as_deref()) {
        print_error(format!("Could not set up logging: {error}"));
        exit(1);
    }

    if let Err(error) = run(cli).await {
        tracing::debug!("command failed: {error:?}");
        print_error(&error);
        if let Some(hint) = hint(&error) {
            eprintln!("{hint}");
        }
        exit(1);
    }
}

/// What the user can do about `error`, if anything.
fn hint(error: &Error) -> Option<&'static str> {
    match error {
        Error::Unauthorized(_) => Some("Run `tally login` to start a new session."),
        error if error.is_retryable() => Some("The backend could not be reached, try again later."),
        _ => None,
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let config = Config::new(
        &cli.api_url,
        cli.token_file.or_else(default_token_path),
        &cli.timezone,
        Duration::from_secs(cli.timeout),
    )?;
    let client = config.api_client()?;

    match cli.command {
        Command::Login { email } => {
            let password = prompt_password("Password: ")?;
            let mut session = SessionController::new(client);
            let user = session.login(&email, &password).await?;
            println!("Logged in as {} <{}>", user.username, user.email);
        }
        Command::Register { username, email } => {
            let password = prompt_password("Password: ")?;
            let password_confirmation = prompt_password("Confirm password: ")?;
            let mut session = SessionController::new(client);
            session
                .register(&RegistrationForm {
                    username,
                    email,
                    password,
                    password_confirmation,
                })
                .await?;
            println!("Account created. Run `tally login` to log in.");
        }
        Command::Logout => {
            let mut session = SessionController::new(client);
            match session.logout().await {
                Ok(()) => println!("Logged out."),
                Err(error @ Error::Io(_)) => return Err(error),
                Err(error) => {
                    println!("Logged out.");
                    print_error(format!("The server could not end the session: {error}"));
                }
            }
        }
        Command::Whoami => {
            let mut session = SessionController::new(client);
            let user = session.get_current_user().await?;
            println!("{} <{}> (ID {})", user.username, user.email, user.id);
        }
        Command::Transactions(command) => run_transactions(command, &client, &config).await?,
        Command::Budget(command) => run_budget(command, &client, &config).await?,
        Command::Dashboard { month } => {
            let month = month_or_current(month.as_deref(), &config)?;
            let transactions = get_transactions(&TransactionFilter::default(), &client).await?;
            let budget = get_budget(Some(month), &client).await?;
            let summary = summarize(&transactions, month, budget.map(|budget| budget.amount))?;

            println!("{summary}");

            let months = available_months(&transactions);
            if !months.is_empty() {
                let months: Vec<String> = months.iter().map(YearMonth::to_string).collect();
                println!();
                println!("Months with transactions: {}", months.join(", "));
            }
        }
        Command::Export { filter, output } => {
            let transaction_filter = filter.to_filter()?;
            let transactions = get_transactions(&transaction_filter, &client).await?;

            if output == "-" {
                write_transactions_csv(&transactions, io::stdout().lock())?;
            } else {
                let path = PathBuf::from(output).join(export_filename(transaction_filter.month));
                let file = File::create(&path)?;
                write_transactions_csv(&transactions, BufWriter::new(file))?;
                println!(
                    "Saved {} transactions to {}",
                    transactions.len(),
                    path.display()
                );
            }
        }
    }

    Ok(())
}

async fn run_transactions(
    command: TransactionsCommand,
    client: &ApiClient,
    config: &Config,
) -> Result<(), Error> {
    match command {
        TransactionsCommand::List { filter } => {
            let transactions = get_transactions(&filter.to_filter()?, client).await?;
            if transactions.is_empty() {
                println!("No transactions found.");
            }
            for transaction in &transactions {
                print_transaction_row(transaction);
            }
        }
        TransactionsCommand::Show { id } => {
            let transaction = get_transaction(id, client).await?;
            print_transaction_row(&transaction);
            if let Some(notes) = transaction.notes.as_deref().filter(|notes| !notes.is_empty()) {
                println!("  {notes}");
            }
        }
        TransactionsCommand::Add {
            subject,
            amount,
            kind,
            category,
            date,
            notes,
        } => {
            let date = match date {
                Some(date) => parse_date(&date)?,
                None => today(&config.timezone)?,
            };
            warn_unknown_category(&category);
            let new = NewTransaction::build(&subject, amount, date)
                .category(&category)
                .kind(kind.parse::<TransactionType>()?)
                .notes(&notes);
            let transaction = create_transaction(&new, client).await?;
            print_transaction_row(&transaction);
        }
        TransactionsCommand::Edit { id, changes } => {
            let current = get_transaction(id, client).await?;
            let update = changes.apply(&current)?;
            let transaction = update_transaction(id, &update, client).await?;
            print_transaction_row(&transaction);
        }
        TransactionsCommand::Delete { ids } => {
            let report = delete_transactions(&ids, client).await;
            println!("Deleted {} of {} transactions.", report.deleted.len(), ids.len());
            for (id, error) in &report.failed {
                print_error(format!("Could not delete transaction {id}: {error}"));
            }
            if let Some((_, error)) = report.failed.into_iter().next() {
                return Err(error);
            }
        }
    }

    Ok(())
}

async fn run_budget(
    command: BudgetCommand,
    client: &ApiClient,
    config: &Config,
) -> Result<(), Error> {
    match command {
        BudgetCommand::Show { month } => {
            let month = month_or_current(month.as_deref(), config)?;
            match get_budget(Some(month), client).await? {
                Some(budget) => println!(
                    "Budget for {}: {}",
                    budget.month.long_name(),
                    format_currency(budget.amount)
                ),
                None => println!("No budget set for {}.", month.long_name()),
            }
        }
        BudgetCommand::Set { amount, month } => {
            let month = month_or_current(month.as_deref(), config)?;
            let transactions = get_transactions(&TransactionFilter::default(), client).await?;
            let remaining_balance = totals(&transactions)?.balance();
            let budget = set_budget(amount, month, remaining_balance, client).await?;
            println!(
                "Budget for {} set to {}",
                budget.month.long_name(),
                format_currency(budget.amount)
            );
        }
    }

    Ok(())
}

fn month_or_current(month: Option<&str>, config: &Config) -> Result<YearMonth, Error> {
    match month {
        Some(month) => Ok(month.parse::<YearMonth>()?),
        None => current_month(&config.timezone),
    }
}

/// Parse a `YYYY-MM-DD` date, ignoring surrounding whitespace.
fn parse_date(text: &str) -> Result<Date, Error> {
    let text = text.trim();
    let invalid = || tally::ValidationError::InvalidDate(text.to_owned());

    if text.len() != 10 {
        return Err(invalid().into());
    }

    let month: YearMonth = text.parse()?;
    let day = text
        .get(8..10)
        .and_then(|day| day.parse::<u8>().ok())
        .ok_or_else(invalid)?;

    Date::from_calendar_date(month.year(), month.month(), day).map_err(|_| invalid().into())
}

fn warn_unknown_category(category: &str) {
    if !CATEGORIES.contains(&category) {
        eprintln!(
            "Note: {category:?} is not one of the known categories ({}).",
            CATEGORIES.join(", ")
        );
    }
}

fn print_transaction_row(transaction: &Transaction) {
    let sign = match transaction.kind {
        TransactionType::Income => "+",
        TransactionType::Expense => "-",
        TransactionType::Other(_) => " ",
    };

    println!(
        "{:>5}  {}  {:<30} {:<15} {sign}{}",
        transaction.id,
        transaction.date,
        transaction.subject,
        transaction.category,
        format_currency(transaction.amount)
    );
}

fn prompt_password(prompt: &str) -> Result<String, Error> {
    Ok(rpassword::prompt_password(prompt)?)
}

fn print_error(error: impl ToString) {
    eprintln!("\x1b[31;1m{}\x1b[0m", error.to_string());
}
