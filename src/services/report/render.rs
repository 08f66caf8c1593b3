//! Turns a generated payload into the stored file and its summary block.

use super::aggregate::{count_data_points, ReportData};
use crate::models::report::{FileFormat, ReportType};
use crate::utils::{data_uri, format::rupiah};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::fmt::Write as _;

const RULE_WIDTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub mime: &'static str,
    pub content: String,
}

impl RenderedFile {
    pub fn to_data_uri(&self) -> String {
        data_uri::encode(self.mime, &self.content)
    }
}

pub fn mime_for(format: FileFormat) -> &'static str {
    match format {
        FileFormat::Json => "application/json",
        FileFormat::Csv | FileFormat::Pdf | FileFormat::Excel => "text/plain",
    }
}

/// Pdf and excel are stored as the plain-text layout.
pub fn render(
    format: FileFormat,
    data: &ReportData,
    data_json: &Value,
    generated_at: DateTime<Utc>,
) -> RenderedFile {
    let content = match format {
        FileFormat::Json => pretty(data_json),
        FileFormat::Csv => csv(data, data_json),
        FileFormat::Pdf | FileFormat::Excel => text(data, data_json, generated_at),
    };
    RenderedFile {
        mime: mime_for(format),
        content,
    }
}

/// `summary_data` stored beside the payload.
pub fn summary(data: &ReportData, data_json: &Value, generated_at: DateTime<Utc>) -> Value {
    let report_type = data.report_type();
    json!({
        "reportType": report_type,
        "generatedAt": generated_at,
        "dataPoints": count_data_points(data_json),
        "executiveSummary": executive_summary(data),
        "keyMetrics": data.key_metrics(),
    })
}

pub fn executive_summary(data: &ReportData) -> String {
    match data {
        ReportData::Sales(r) => format!(
            "Laporan penjualan menunjukkan {} transaksi dengan total pendapatan {}",
            r.summary.total_transactions,
            rupiah(r.summary.total_revenue as f64)
        ),
        ReportData::Financial(r) => format!(
            "Laporan finansial dengan total pendapatan {} dari {} transaksi",
            rupiah(r.summary.total_revenue as f64),
            r.summary.total_transactions
        ),
        ReportData::Inventory(r) => format!(
            "Laporan inventory mencatat {} kendaraan dengan nilai total {}",
            r.summary.total_vehicles,
            rupiah(r.summary.total_inventory_value as f64)
        ),
        other => format!("Laporan {} berhasil dibuat", type_name(other.report_type())),
    }
}

fn type_name(report_type: ReportType) -> String {
    sea_orm::ActiveEnum::to_value(&report_type)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Integers print without a fractional part.
fn number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Quote a CSV field when it would otherwise split the row.
fn field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

fn csv(data: &ReportData, data_json: &Value) -> String {
    let mut out = String::new();
    match data {
        ReportData::Sales(r) => {
            out.push_str("Date,Transaction ID,Amount,Customer,Category\n");
            for t in &r.transactions {
                let _ = writeln!(
                    out,
                    "{},{},{},{},{}",
                    t.created_at.format("%Y-%m-%dT%H:%M:%S"),
                    t.id,
                    t.total_amount,
                    field(t.customer_name.as_deref().unwrap_or("Unknown")),
                    field(t.category.as_deref().unwrap_or("Unknown")),
                );
            }
            let _ = writeln!(out, "\n\nSummary\nTotal Revenue,{}", r.summary.total_revenue);
            let _ = writeln!(out, "Total Transactions,{}", r.summary.total_transactions);
            let _ = writeln!(
                out,
                "Average Transaction,{}",
                number(r.summary.average_transaction_value)
            );
        }
        ReportData::Financial(r) => {
            out.push_str("Metric,Value\n");
            let _ = writeln!(out, "Total Revenue,{}", r.summary.total_revenue);
            let _ = writeln!(out, "Total Transactions,{}", r.summary.total_transactions);
            let _ = writeln!(
                out,
                "Average Transaction,{}",
                number(r.summary.average_transaction_value)
            );
            out.push_str("\n\nRevenue by Payment Method\n");
            for (method, amount) in &r.revenue_by_payment_method {
                let _ = writeln!(out, "{},{}", field(method), amount);
            }
        }
        ReportData::Inventory(r) => {
            out.push_str("Inventory Report\n");
            let _ = writeln!(out, "Total Vehicles,{}", r.summary.total_vehicles);
            let _ = writeln!(
                out,
                "Total Inventory Value,{}",
                r.summary.total_inventory_value
            );
            let _ = writeln!(
                out,
                "Average Vehicle Price,{}",
                number(r.summary.average_vehicle_price)
            );
            out.push_str("\n\nVehicles by Category\n");
            for (category, count) in &r.inventory_by_category {
                let _ = writeln!(out, "{},{}", field(category), count);
            }
        }
        _ => {
            out.push_str("Report Data\n");
            out.push_str(&pretty(data_json));
        }
    }
    out
}

fn text(data: &ReportData, data_json: &Value, generated_at: DateTime<Utc>) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "LAPORAN {}",
        type_name(data.report_type()).to_uppercase()
    );
    let _ = writeln!(
        out,
        "Generated: {}",
        generated_at.format("%d/%m/%Y %H.%M.%S")
    );
    let _ = writeln!(out, "{rule}\n");

    match data {
        ReportData::Sales(r) => {
            out.push_str("SALES REPORT SUMMARY\n");
            let _ = writeln!(out, "Total Revenue: {}", rupiah(r.summary.total_revenue as f64));
            let _ = writeln!(out, "Total Transactions: {}", r.summary.total_transactions);
            let _ = writeln!(
                out,
                "Average Transaction: {}",
                rupiah(r.summary.average_transaction_value)
            );
            let _ = writeln!(out, "Unique Customers: {}\n", r.summary.unique_customers);
            out.push_str("SALES BY CATEGORY:\n");
            for (category, count) in &r.sales_by_category {
                let _ = writeln!(out, "- {category}: {count} transactions");
            }
        }
        ReportData::Financial(r) => {
            out.push_str("FINANCIAL REPORT SUMMARY\n");
            let _ = writeln!(out, "Total Revenue: {}", rupiah(r.summary.total_revenue as f64));
            let _ = writeln!(out, "Total Transactions: {}", r.summary.total_transactions);
            let _ = writeln!(
                out,
                "Average Transaction: {}\n",
                rupiah(r.summary.average_transaction_value)
            );
            out.push_str("REVENUE BY PAYMENT METHOD:\n");
            for (method, amount) in &r.revenue_by_payment_method {
                let _ = writeln!(out, "- {method}: {}", rupiah(*amount as f64));
            }
        }
        ReportData::Inventory(r) => {
            out.push_str("INVENTORY REPORT SUMMARY\n");
            let _ = writeln!(out, "Total Vehicles: {}", r.summary.total_vehicles);
            let _ = writeln!(
                out,
                "Total Inventory Value: {}",
                rupiah(r.summary.total_inventory_value as f64)
            );
            let _ = writeln!(
                out,
                "Average Vehicle Price: {}\n",
                rupiah(r.summary.average_vehicle_price)
            );
            out.push_str("VEHICLES BY CATEGORY:\n");
            for (category, count) in &r.inventory_by_category {
                let _ = writeln!(out, "- {category}: {count} vehicles");
            }
        }
        _ => {
            out.push_str("REPORT DATA:\n");
            out.push_str(&pretty(data_json));
        }
    }

    let _ = write!(out, "\n\n{rule}\nEnd of Report\n");
    out
}
