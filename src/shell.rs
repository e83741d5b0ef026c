//! Line-oriented front end over the view coordinator.

use color_eyre::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::api::{Employee, Transaction};
use crate::commands::{self, Action, COMMANDS};
use crate::coordinator::ViewCoordinator;

pub struct Shell<W: Write> {
  coordinator: ViewCoordinator,
  out: W,
  /// Whether to quit
  should_quit: bool,
}

impl<W: Write> Shell<W> {
  pub fn new(coordinator: ViewCoordinator, out: W) -> Self {
    Self {
      coordinator,
      out,
      should_quit: false,
    }
  }

  /// Mount, then read commands until `quit` or end of input.
  ///
  /// A failing command is reported and the loop carries on; only output
  /// errors end it.
  pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<()> {
    if let Err(e) = self.coordinator.mount().await {
      warn!(error = %e, "Initial load failed");
      writeln!(self.out, "error: {:#}", e)?;
    }
    self.render()?;

    let mut lines = input.lines();
    while !self.should_quit {
      write!(self.out, "> ")?;
      self.out.flush()?;

      let Some(line) = lines.next_line().await? else {
        break;
      };

      if let Err(e) = self.execute(&line).await {
        writeln!(self.out, "error: {:#}", e)?;
      }
    }

    Ok(())
  }

  /// Run one command line
  pub async fn execute(&mut self, line: &str) -> Result<()> {
    match commands::parse(line)? {
      Action::All => {
        self.coordinator.select_employee(&Employee::all()).await?;
        self.render()?;
      }
      Action::Employee(id) => {
        self.coordinator.load_transactions_by_employee(&id).await?;
        self.render()?;
      }
      Action::Employees => self.render_employees()?,
      Action::More => {
        if self.coordinator.load_more_disabled() {
          writeln!(self.out, "Still loading")?;
        } else {
          self.coordinator.load_more().await?;
          self.render()?;
        }
      }
      Action::SetApproval {
        transaction_id,
        value,
      } => {
        self
          .coordinator
          .set_transaction_approval(&transaction_id, value)
          .await?;
        self.render()?;
      }
      Action::Show => self.render()?,
      Action::Refresh => {
        self.coordinator.refresh().await?;
        self.render()?;
      }
      Action::Help => self.render_help()?,
      Action::Quit => self.should_quit = true,
    }
    Ok(())
  }

  fn render(&mut self) -> Result<()> {
    let Some(transactions) = self.coordinator.visible_transactions() else {
      writeln!(self.out, "Loading...")?;
      return Ok(());
    };

    if transactions.is_empty() {
      writeln!(self.out, "No transactions")?;
    }
    for transaction in &transactions {
      writeln!(self.out, "{}", format_transaction(transaction))?;
    }

    if !self.coordinator.all_transactions_loaded() {
      writeln!(self.out, "-- View More (more) --")?;
    }
    Ok(())
  }

  fn render_employees(&mut self) -> Result<()> {
    let options = self.coordinator.employee_options();
    if options.is_empty() {
      writeln!(self.out, "Employees not loaded")?;
    }
    for employee in options {
      let id = if employee.is_all() { "-" } else { employee.id.as_str() };
      writeln!(self.out, "{:<10} {}", id, employee.full_name())?;
    }
    Ok(())
  }

  fn render_help(&mut self) -> Result<()> {
    for cmd in COMMANDS {
      writeln!(
        self.out,
        "{:<26} {} ({})",
        cmd.usage,
        cmd.description,
        cmd.aliases.join(", ")
      )?;
    }
    Ok(())
  }
}

fn format_transaction(transaction: &Transaction) -> String {
  format!(
    "[{}] {}  {:<18} {:>9.2}  {} - {}",
    if transaction.approved { "x" } else { " " },
    transaction.id,
    transaction.merchant,
    transaction.amount,
    transaction.employee.full_name(),
    transaction.date
  )
}
