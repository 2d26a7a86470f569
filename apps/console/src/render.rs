//! Plain-text rendering for the console.

use chrono::{DateTime, NaiveDate, Utc};
use client_core::{Column, ListView, Notification, NotificationLevel};
use shared::domain::{Customer, InternetPlan, Invoice, Subscription};

pub const EMPTY_PLACEHOLDER: &str = "No customers found.";
const MISSING: &str = "-";

pub fn column_label(column: Column) -> &'static str {
    match column {
        Column::Username => "Username",
        Column::FullName => "Full name",
        Column::Phone => "Phone",
        Column::Address => "Address",
        Column::Status => "Status",
        Column::RegistrationDate => "Registered",
        Column::Notes => "Notes",
    }
}

fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

fn or_missing(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => MISSING.to_string(),
    }
}

pub fn cell(customer: &Customer, column: Column) -> String {
    match column {
        Column::Username => customer.username.clone(),
        Column::FullName => customer.full_name.clone(),
        Column::Phone => or_missing(customer.phone.as_deref()),
        Column::Address => or_missing(Some(customer.address.inline().as_str())),
        Column::Status => customer.status.to_string(),
        Column::RegistrationDate => customer
            .registration_date
            .as_ref()
            .map(format_timestamp)
            .unwrap_or_else(|| MISSING.to_string()),
        Column::Notes => or_missing(customer.notes.as_deref()),
    }
}

fn table_line(values: &[&str], widths: &[usize]) -> String {
    values
        .iter()
        .zip(widths)
        .map(|(value, width)| format!("{value:<width$}", width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut out = vec![
        table_line(headers, &widths),
        table_line(&rule.iter().map(String::as_str).collect::<Vec<_>>(), &widths),
    ];
    for row in rows {
        out.push(table_line(
            &row.iter().map(String::as_str).collect::<Vec<_>>(),
            &widths,
        ));
    }
    out.join("\n")
}

/// Rows of the current page under the visible columns, followed by the
/// pagination footer.
pub fn customer_table(view: &ListView) -> String {
    if view.is_empty() {
        return format!("{EMPTY_PLACEHOLDER}\n{}", footer(view));
    }

    let columns = view.query.column_visibility.visible_columns();
    let headers: Vec<&str> = columns.iter().map(|c| column_label(*c)).collect();
    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|customer| columns.iter().map(|c| cell(customer, *c)).collect())
        .collect();
    format!("{}\n{}", table(&headers, &rows), footer(view))
}

pub fn footer(view: &ListView) -> String {
    let query = &view.query;
    let mut parts = vec![
        format!(
            "page {} of {}",
            query.page_index + 1,
            query.total_pages.max(1)
        ),
        format!("size {}", query.page_size),
    ];
    if view.can_previous {
        parts.push("prev".to_string());
    }
    if view.can_next {
        parts.push("next".to_string());
    }
    if view.is_loading {
        parts.push("loading...".to_string());
    }
    parts.join(" | ")
}

pub fn notification(notification: &Notification) -> String {
    match notification.level {
        NotificationLevel::Success => format!("[ok] {}", notification.message),
        NotificationLevel::Error => format!("[error] {}", notification.message),
    }
}

pub fn customer_detail(customer: &Customer) -> String {
    Column::ALL
        .iter()
        .map(|column| format!("{:<11} {}", column_label(*column), cell(customer, *column)))
        .chain(std::iter::once(format!("{:<11} {}", "Id", customer.id)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn plan_table(plans: &[InternetPlan]) -> String {
    if plans.is_empty() {
        return "No internet plans found.".to_string();
    }
    let rows: Vec<Vec<String>> = plans
        .iter()
        .map(|plan| {
            vec![
                plan.id.to_string(),
                plan.name.clone(),
                plan.speed.clone(),
                plan.bandwidth.clone(),
                format!("{:.2}", plan.price),
                if plan.is_active { "active" } else { "inactive" }.to_string(),
            ]
        })
        .collect();
    table(&["Id", "Name", "Speed", "Bandwidth", "Price", "State"], &rows)
}

pub fn subscription_summary(
    subscription: &Subscription,
    plans: &[InternetPlan],
    today: NaiveDate,
) -> String {
    let mut lines = vec![
        format!(
            "Customer    {} ({})",
            subscription.customer.full_name, subscription.customer.username
        ),
        format!(
            "Plan        {} ({}, {:.2})",
            subscription.internet_plan.name,
            subscription.internet_plan.speed,
            subscription.internet_plan.price
        ),
        format!("Status      {}", subscription.status),
        format!(
            "Period      {} to {}",
            subscription.start_date.format("%Y-%m-%d"),
            subscription.end_date
        ),
    ];
    if subscription.is_expiring_soon(today) {
        lines.push("Warning     expires within a week".to_string());
    } else if subscription.is_expired(today) {
        lines.push("Warning     expired".to_string());
    }
    let alternatives: Vec<&str> = plans
        .iter()
        .filter(|plan| plan.is_active && plan.id != subscription.internet_plan.id)
        .map(|plan| plan.name.as_str())
        .collect();
    if !alternatives.is_empty() {
        lines.push(format!("Other plans {}", alternatives.join(", ")));
    }
    lines.join("\n")
}

pub fn invoice_table(invoices: &[Invoice]) -> String {
    if invoices.is_empty() {
        return "No invoices found.".to_string();
    }
    let rows: Vec<Vec<String>> = invoices
        .iter()
        .map(|invoice| {
            vec![
                invoice.id.to_string(),
                invoice.issue_date.format("%Y-%m-%d").to_string(),
                invoice.due_date.format("%Y-%m-%d").to_string(),
                format!("{:.2}", invoice.amount_due),
                format!("{:.2}", invoice.amount_paid),
                if invoice.is_paid { "paid" } else { "open" }.to_string(),
            ]
        })
        .collect();
    table(&["Id", "Issued", "Due", "Amount", "Paid", "State"], &rows)
}
