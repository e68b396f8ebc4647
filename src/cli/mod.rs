use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{QueryKey, SyncController};
use crate::config::Settings;
use crate::domain::{
    compute_balance, format_cents, verify_balance, Account, AccountId, BalanceStats, Transaction,
    TransactionKind, TransactionStats,
};
use crate::storage::Repository;

/// Bankflow - personal banking ledger client
#[derive(Parser)]
#[command(name = "bankflow")]
#[command(about = "Open accounts, record deposits and withdrawals, and review your balances")]
#[command(version)]
pub struct Cli {
    /// Settings file (JSON); falls back to $BANKFLOW_CONFIG
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file path (overrides the settings file)
    #[arg(short, long, global = true, env = "BANKFLOW_DATABASE")]
    pub database: Option<String>,

    /// Print lists and statistics as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Deposit money into an account
    Deposit {
        /// Account ID
        account: String,

        /// Amount (e.g., "50.00" or "50")
        amount: String,
    },

    /// Withdraw money from an account
    Withdraw {
        /// Account ID
        account: String,

        /// Amount (e.g., "50.00" or "50")
        amount: String,
    },

    /// Show the transaction history of an account, most recent first
    History {
        /// Account ID
        account: String,
    },

    /// Show total balance and transaction statistics
    Stats,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Open {
        /// Initial balance (zero or more)
        balance: String,

        /// Account type: current, savings
        #[arg(short = 't', long = "type", default_value = "current")]
        account_type: String,
    },

    /// Close an account
    Close {
        /// Account ID
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// List all accounts
    List,
}

struct Output<'a> {
    settings: &'a Settings,
    json: bool,
}

impl Cli {
    pub async fn run(self, settings: Settings) -> Result<()> {
        let database = self
            .database
            .clone()
            .unwrap_or_else(|| settings.database_path.clone());
        let out = Output {
            settings: &settings,
            json: self.json,
        };

        if matches!(self.command, Commands::Init) {
            Repository::open(&database).await?;
            println!("Database initialized: {}", database);
            return Ok(());
        }

        let repo = Repository::open(&database).await?;
        let controller = SyncController::new(Arc::new(repo));

        match self.command {
            Commands::Init => {}

            Commands::Account(cmd) => run_account_command(&controller, &out, cmd).await?,

            Commands::Deposit { account, amount } => {
                run_transaction_command(&controller, &out, &account, &amount, TransactionKind::Deposit)
                    .await?
            }

            Commands::Withdraw { account, amount } => {
                run_transaction_command(
                    &controller,
                    &out,
                    &account,
                    &amount,
                    TransactionKind::Withdrawal,
                )
                .await?
            }

            Commands::History { account } => {
                let account_id = parse_account_id(&account)?;
                let history_view = controller
                    .watch(QueryKey::AccountTransactions(account_id))
                    .await?;
                let accounts_view = controller.watch(QueryKey::Accounts).await?;
                let (history, accounts) = tokio::join!(
                    controller.load(history_view),
                    controller.load(accounts_view)
                );
                history?;
                accounts?;

                let history = controller.history(account_id).await.unwrap_or_default();
                let account = controller
                    .accounts()
                    .await
                    .and_then(|accounts| accounts.into_iter().find(|a| a.id == account_id));
                out.history(account.as_ref(), &history)?;
            }

            Commands::Stats => {
                let balance_view = controller.watch(QueryKey::BalanceStats).await?;
                let tx_view = controller.watch(QueryKey::TransactionStats).await?;
                let (balance, transactions) =
                    tokio::join!(controller.load(balance_view), controller.load(tx_view));
                balance?;
                transactions?;

                out.stats(
                    &controller.balance_stats().await.unwrap_or_default(),
                    &controller.transaction_stats().await.unwrap_or_default(),
                )?;
            }
        }

        Ok(())
    }
}

async fn run_account_command(
    controller: &SyncController,
    out: &Output<'_>,
    cmd: AccountCommands,
) -> Result<()> {
    match cmd {
        AccountCommands::Open {
            balance,
            account_type,
        } => {
            let account = controller
                .open_account(Some(&balance), Some(&account_type))
                .await?;
            println!(
                "Opened {} account {} with {}",
                account.account_type.style().label,
                account.id,
                out.money(account.balance)
            );
        }

        AccountCommands::Close { id, yes } => {
            let account_id = parse_account_id(&id)?;
            if !yes && !confirm(&format!("Close account {}?", account_id))? {
                println!("Aborted.");
                return Ok(());
            }
            controller.close_account(account_id).await?;
            println!("Closed account {}", account_id);
        }

        AccountCommands::List => {
            let view = controller.watch(QueryKey::Accounts).await?;
            controller.load(view).await?;
            out.accounts(&controller.accounts().await.unwrap_or_default())?;
        }
    }
    Ok(())
}

async fn run_transaction_command(
    controller: &SyncController,
    out: &Output<'_>,
    account: &str,
    amount: &str,
    kind: TransactionKind,
) -> Result<()> {
    let account_id = parse_account_id(account)?;

    // The account listing gives the local funds check a balance to work with
    // and is refreshed after the transaction is recorded.
    let accounts_view = controller.watch(QueryKey::Accounts).await?;
    controller.load(accounts_view).await?;

    let transaction = controller
        .record_transaction(account_id, Some(amount), Some(kind.as_str()))
        .await?;

    let style = transaction.kind.style();
    println!(
        "{} recorded: {}{} ({})",
        style.label,
        style.sign,
        out.money(transaction.amount),
        transaction.id
    );

    let balance = controller
        .accounts()
        .await
        .and_then(|accounts| accounts.into_iter().find(|a| a.id == account_id))
        .map(|a| a.balance);
    if let Some(balance) = balance {
        println!("New balance: {}", out.money(balance));
    }
    Ok(())
}

impl Output<'_> {
    fn money(&self, cents: i64) -> String {
        format!("{} {}", format_cents(cents), self.settings.currency_label)
    }

    fn accounts(&self, accounts: &[Account]) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(accounts)?);
            return Ok(());
        }
        if accounts.is_empty() {
            println!("No accounts found.");
            return Ok(());
        }

        println!(
            "{:<38} {:<10} {:>16} {:<12}",
            "ID", "TYPE", "BALANCE", "CREATED"
        );
        println!("{}", "-".repeat(80));
        for account in accounts {
            println!(
                "{:<38} {:<10} {:>16} {:<12}",
                account.id,
                account.account_type.style().label,
                self.money(account.balance),
                account.created_at.format(&self.settings.date_format)
            );
        }
        Ok(())
    }

    fn history(&self, account: Option<&Account>, transactions: &[Transaction]) -> Result<()> {
        if let Some(account) = account {
            if let Err(err) = verify_balance(account, transactions) {
                tracing::warn!(account = %account.id, error = %err, "balance does not match history");
            }
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(transactions)?);
            return Ok(());
        }
        if transactions.is_empty() {
            println!("No transactions yet.");
        } else {
            println!("{:<12} {:<12} {:>16}", "DATE", "KIND", "AMOUNT");
            println!("{}", "-".repeat(42));
            for tx in transactions {
                let style = tx.kind.style();
                println!(
                    "{:<12} {:<12} {:>16}",
                    tx.date.format(&self.settings.date_format),
                    style.label,
                    format!("{}{}", style.sign, self.money(tx.amount))
                );
            }
        }

        match account {
            Some(account) => println!(
                "Opening balance {}, now {}",
                self.money(account.initial_balance),
                self.money(compute_balance(account.initial_balance, transactions))
            ),
            None => println!("No open account with this ID."),
        }
        Ok(())
    }

    fn stats(&self, balance: &BalanceStats, transactions: &TransactionStats) -> Result<()> {
        if self.json {
            let report = serde_json::json!({
                "balance": balance,
                "transactions": transactions,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("Total balance:     {}", self.money(balance.sum));
        println!(
            "Accounts:          {} (avg {})",
            balance.count,
            self.money(balance.average)
        );
        println!("Total deposits:    {}", self.money(transactions.sum_deposits));
        println!("Total withdrawals: {}", self.money(transactions.sum_withdrawals));
        println!("Net flow:          {}", self.money(transactions.net()));
        println!("Transactions:      {}", transactions.count);
        Ok(())
    }
}

fn parse_account_id(input: &str) -> Result<AccountId> {
    Uuid::parse_str(input.trim()).context("Invalid account ID format (expected UUID)")
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
