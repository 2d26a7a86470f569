//! Interactive customer browser driven by lines on stdin.

use std::{io::Write, sync::Arc};

use anyhow::{anyhow, bail, Context};
use client_core::{Column, CustomerListController, ListEvent, PageSize};
use shared::domain::{CustomerId, CustomerStatus};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::warn;

use crate::render;

pub const HELP: &str = "\
commands:
  search <text>       set the search text (empty clears it)
  status <STATUS|none> set the status filter
  go                  run the search from the first page
  sort                cycle registration date sort: none, desc, asc
  reset               clear search, status and sort
  page <n>            jump to page n
  next | prev         move one page
  size <5|10|15|20>   change the page size
  toggle <column>     show or hide phone, address, status, registrationDate, notes
  delete <id>         delete a customer and reload the page
  show                print the current page
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Search(String),
    Status(Option<CustomerStatus>),
    Go,
    Sort,
    Reset,
    /// Zero-based page index.
    Page(u32),
    Next,
    Prev,
    Size(PageSize),
    Toggle(Column),
    Delete(CustomerId),
    Show,
    Help,
    Quit,
}

fn required<'a>(arg: &'a str, usage: &str) -> anyhow::Result<&'a str> {
    if arg.is_empty() {
        bail!("usage: {usage}");
    }
    Ok(arg)
}

/// `Ok(None)` for blank input.
pub fn parse_command(line: &str) -> anyhow::Result<Option<ReplCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, arg) = line
        .split_once(char::is_whitespace)
        .map(|(word, arg)| (word, arg.trim()))
        .unwrap_or((line, ""));

    let command = match word.to_ascii_lowercase().as_str() {
        "search" => ReplCommand::Search(arg.to_string()),
        "status" => {
            let arg = required(arg, "status <STATUS|none>")?;
            if arg.eq_ignore_ascii_case("none") || arg.eq_ignore_ascii_case("all") {
                ReplCommand::Status(None)
            } else {
                ReplCommand::Status(Some(arg.parse()?))
            }
        }
        "go" => ReplCommand::Go,
        "sort" => ReplCommand::Sort,
        "reset" => ReplCommand::Reset,
        "page" => {
            let arg = required(arg, "page <n>")?;
            let number: u32 = arg
                .parse()
                .with_context(|| format!("'{arg}' is not a page number"))?;
            let index = number
                .checked_sub(1)
                .ok_or_else(|| anyhow!("pages are numbered from 1"))?;
            ReplCommand::Page(index)
        }
        "next" => ReplCommand::Next,
        "prev" | "previous" => ReplCommand::Prev,
        "size" => {
            let arg = required(arg, "size <5|10|15|20>")?;
            let value: u32 = arg
                .parse()
                .with_context(|| format!("'{arg}' is not a page size"))?;
            ReplCommand::Size(PageSize::try_from(value)?)
        }
        "toggle" => ReplCommand::Toggle(required(arg, "toggle <column>")?.parse()?),
        "delete" => ReplCommand::Delete(CustomerId::new(required(arg, "delete <id>")?)),
        "show" | "ls" => ReplCommand::Show,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        other => bail!("unknown command '{other}', try 'help'"),
    };
    Ok(Some(command))
}

/// Runs one command; returns whether the page should be printed again.
async fn execute(controller: &CustomerListController, command: ReplCommand) -> bool {
    match command {
        ReplCommand::Search(text) => {
            controller.set_search_term(text).await;
            println!("search text set, 'go' to apply");
            false
        }
        ReplCommand::Status(status) => {
            controller.set_status_filter(status).await;
            println!("status filter set, 'go' to apply");
            false
        }
        ReplCommand::Go => {
            controller.submit_search().await;
            true
        }
        ReplCommand::Sort => {
            controller.toggle_sort().await;
            true
        }
        ReplCommand::Reset => {
            controller.reset_filters().await;
            true
        }
        ReplCommand::Page(index) => {
            controller.change_page(index).await;
            true
        }
        ReplCommand::Next => {
            if controller.next_page().await.is_none() {
                println!("already on the last page");
                return false;
            }
            true
        }
        ReplCommand::Prev => {
            if controller.previous_page().await.is_none() {
                println!("already on the first page");
                return false;
            }
            true
        }
        ReplCommand::Size(size) => {
            controller.change_page_size(size).await;
            true
        }
        ReplCommand::Toggle(column) => {
            if !controller.toggle_column(column).await {
                println!("{column} is always shown");
                return false;
            }
            true
        }
        ReplCommand::Delete(id) => {
            controller.delete_customer(&id).await;
            true
        }
        ReplCommand::Show => true,
        ReplCommand::Help => {
            println!("{HELP}");
            false
        }
        ReplCommand::Quit => false,
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

pub async fn run(controller: Arc<CustomerListController>) -> anyhow::Result<()> {
    let mut events = controller.subscribe_events();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ListEvent::Notification(notification)) => {
                    println!("{}", render::notification(&notification));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "dropped list events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("{}", render::customer_table(&controller.view().await));
    prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match parse_command(&line) {
            Ok(Some(ReplCommand::Quit)) => break,
            Ok(Some(command)) => {
                if execute(&controller, command).await {
                    // Let the notification printer run before the table.
                    tokio::task::yield_now().await;
                    println!("{}", render::customer_table(&controller.view().await));
                }
            }
            Ok(None) => {}
            Err(err) => println!("{err:#}"),
        }
        prompt();
    }

    printer.abort();
    Ok(())
}
