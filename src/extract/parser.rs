//! Detail view parsing.
//!
//! Each extraction step is independent and merges into one record: labeled
//! header fields, the footer summary, the no-debt marker, the line-item
//! grid, and a label-mining sweep over the page text. A field that does not
//! resolve is simply absent from the record.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::browser::Driver;
use crate::models::DetailRecord;
use crate::portal;

static OWED_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)importe\s+adeudado\D*?([\d][\d.,]*)").expect("valid amount pattern")
});

static OWED_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)comprobantes\s+adeudados\D*?(\d+)").expect("valid count pattern")
});

/// Known free-text labels mined from the page body when the structured
/// controls did not carry them.
const KNOWN_LABELS: [(&str, &str); 4] = [
    ("suministro", r"(?i)suministro\s*[:\s]\s*(\S+)"),
    ("medidor", r"(?i)medidor\s*[:\s]\s*(\S+)"),
    ("tarifa", r"(?i)tarifa\s*[:\s]\s*(.+)"),
    (
        "proximo_vencimiento",
        r"(?i)pr[oó]ximo\s+vencimiento\s*[:\s]\s*(.+)",
    ),
];

/// Line-item grid cells, in output order.
const ITEM_CELLS: [(&str, &str); 5] = [
    (portal::ITEM_ISSUED, "fecha_emision"),
    (portal::ITEM_DUE, "fecha_vencimiento"),
    (portal::ITEM_REFERENCE, "comprobante"),
    (portal::ITEM_AMOUNT, "importe"),
    (portal::ITEM_STATUS, "estado"),
];

/// Parse the detail view the driver is currently on.
///
/// Never raises: an internal failure yields a record containing only an
/// `error` field.
pub async fn parse_detail(driver: &dyn Driver) -> DetailRecord {
    match try_parse(driver).await {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!(error = %err, "Detail parse failed");
            DetailRecord::from_error(err.to_string())
        }
    }
}

async fn try_parse(driver: &dyn Driver) -> anyhow::Result<DetailRecord> {
    let mut record = DetailRecord::default();

    header_fields(driver, &mut record).await?;
    footer_summary(driver, &mut record).await?;

    let text = driver.page_text().await?;
    if text.contains(portal::NO_DEBT_MARKER) {
        record.set("estado_deuda", portal::NO_DEBT_MARKER);
    }

    line_items(driver, &mut record).await?;
    mine_known_labels(&text, &mut record);

    Ok(record)
}

async fn header_fields(driver: &dyn Driver, record: &mut DetailRecord) -> anyhow::Result<()> {
    if let Some(text) = driver.text_of(portal::DETAIL_ASSOCIATE).await? {
        record.set("asociado", strip_label(&text));
    }
    if let Some(text) = driver.text_of(portal::DETAIL_ADDRESS).await? {
        record.set("domicilio", strip_label(&text));
    }
    if let Some(text) = driver.text_of(portal::DETAIL_PERIOD).await? {
        record.set("periodo_deuda", text.trim());
    }
    Ok(())
}

async fn footer_summary(driver: &dyn Driver, record: &mut DetailRecord) -> anyhow::Result<()> {
    let Some(text) = driver.text_of(portal::DETAIL_SUMMARY).await? else {
        return Ok(());
    };
    record.set("resumen", text.trim());

    let (amount, count) = mine_summary(&text);
    if let Some(amount) = amount {
        record.set("importe_adeudado", amount);
    }
    if let Some(count) = count {
        record.set("comprobantes_adeudados", count);
    }
    Ok(())
}

async fn line_items(driver: &dyn Driver, record: &mut DetailRecord) -> anyhow::Result<()> {
    let rows = driver.count_by_id_prefix(portal::ITEM_ROW_PREFIX).await?;

    for position in 1..=rows {
        let mut row = BTreeMap::new();
        for (variable, key) in ITEM_CELLS {
            if let Some(text) = driver.text_of(&portal::cell_id(variable, position)).await? {
                row.insert(key.to_string(), text.trim().to_string());
            }
        }
        // A row with no resolved cell is layout noise, not a line item.
        if !row.is_empty() {
            record.push_row("comprobantes", row);
        }
    }
    Ok(())
}

/// Drop a leading `Label:` prefix, keeping the value.
pub(crate) fn strip_label(text: &str) -> String {
    match text.split_once(':') {
        Some((_, value)) => value.trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Pull the owed amount and overdue item count out of the footer text.
pub(crate) fn mine_summary(text: &str) -> (Option<String>, Option<String>) {
    let amount = OWED_AMOUNT
        .captures(text)
        .map(|caps| caps[1].to_string());
    let count = OWED_COUNT.captures(text).map(|caps| caps[1].to_string());
    (amount, count)
}

fn mine_known_labels(text: &str, record: &mut DetailRecord) {
    for (key, pattern) in KNOWN_LABELS {
        if record.get(key).is_some() {
            continue;
        }
        let re = Regex::new(pattern).expect("valid label pattern");
        if let Some(caps) = re.captures(text) {
            record.set(key, caps[1].trim());
        }
    }
}
