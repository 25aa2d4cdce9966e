//! Account list extraction.
//!
//! The list view is generated markup, so extraction runs a prioritized chain
//! of strategies: structured grid ids first, then a generic table scrape,
//! then a text-pattern sweep over the page text. The first strategy that
//! yields any rows wins, and a strategy that blows up counts as zero rows.

use std::sync::LazyLock;

use regex::Regex;

use crate::browser::{js, Driver};
use crate::models::{Account, PersonRecord};
use crate::portal;

static ACCOUNT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d+)\s+(Energ[ií]a|Gas|Agua)\s+(.+?)\s+(CONECTADO|DESCONECTADO|ACTIVO|INACTIVO|SUSPENDIDO)",
    )
    .expect("valid account pattern")
});

static LONG_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{10,}").expect("valid digits pattern"));

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid digits pattern"));

static NAME_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^.*NOMBRE\s*").expect("valid name pattern"));

/// Extract the person header and the account list from the list view.
///
/// Never fails: on total degradation the record comes back with empty
/// fields and no accounts.
pub async fn extract_person(driver: &dyn Driver) -> PersonRecord {
    let text = driver.page_text().await.unwrap_or_default();
    let (username, person_id, full_name) = person_fields_from_text(&text);

    let accounts = extract_accounts(driver).await;
    tracing::info!(
        name = %full_name,
        accounts = accounts.len(),
        "Extracted person record"
    );

    PersonRecord {
        username,
        person_id,
        full_name,
        accounts,
    }
}

/// Run the strategy chain over the current page.
pub async fn extract_accounts(driver: &dyn Driver) -> Vec<Account> {
    match rows_from_grid(driver).await {
        Ok(accounts) if !accounts.is_empty() => return accounts,
        Ok(_) => tracing::debug!("Grid id strategy found no rows"),
        Err(err) => tracing::warn!(error = %err, "Grid id strategy failed"),
    }

    match rows_from_table(driver).await {
        Ok(accounts) if !accounts.is_empty() => return accounts,
        Ok(_) => tracing::debug!("Table strategy found no rows"),
        Err(err) => tracing::warn!(error = %err, "Table strategy failed"),
    }

    match driver.page_text().await {
        Ok(text) => {
            let accounts = accounts_from_text(&text);
            if accounts.is_empty() {
                tracing::warn!("No accounts recovered by any strategy");
            }
            accounts
        }
        Err(err) => {
            tracing::warn!(error = %err, "Text strategy failed");
            Vec::new()
        }
    }
}

/// Structured-id strategy: resolve each grid row's cells by id. A missing
/// cell yields an empty field, not a dropped row.
async fn rows_from_grid(driver: &dyn Driver) -> anyhow::Result<Vec<Account>> {
    let rows = driver.count_by_id_prefix(portal::ACCOUNT_ROW_PREFIX).await?;

    let mut accounts = Vec::with_capacity(rows);
    for position in 1..=rows {
        let number = grid_cell(driver, portal::CELL_NUMBER, position).await?;
        let service = grid_cell(driver, portal::CELL_SERVICE, position).await?;
        let address = grid_cell(driver, portal::CELL_ADDRESS, position).await?;
        let status = grid_cell(driver, portal::CELL_STATUS, position).await?;

        let number = number.trim().parse().unwrap_or(0);
        accounts.push(Account::new(
            number,
            service.trim(),
            address.trim(),
            status.trim(),
        ));
    }
    Ok(accounts)
}

async fn grid_cell(
    driver: &dyn Driver,
    variable: &str,
    position: usize,
) -> anyhow::Result<String> {
    Ok(driver
        .text_of(&portal::cell_id(variable, position))
        .await?
        .unwrap_or_default())
}

/// Generic-table strategy: scrape every `table tr` and map cell positions.
async fn rows_from_table(driver: &dyn Driver) -> anyhow::Result<Vec<Account>> {
    let value = driver.eval(js::TABLE_ROWS).await?;
    let rows: Vec<Vec<String>> = serde_json::from_value(value).unwrap_or_default();
    Ok(accounts_from_cell_rows(&rows))
}

/// Map scraped cell rows to accounts. Header and chrome rows carry fewer
/// cells than the 4 data columns and are dropped. A non-numeric first cell
/// becomes the 0 sentinel, meaning "not parsed".
pub(crate) fn accounts_from_cell_rows(rows: &[Vec<String>]) -> Vec<Account> {
    rows.iter()
        .filter(|cells| cells.len() >= 4)
        .map(|cells| {
            let number = cells[0].trim().parse().unwrap_or(0);
            Account::new(number, cells[1].trim(), cells[2].trim(), cells[3].trim())
        })
        .collect()
}

/// Text-pattern strategy, the last resort: match account-shaped lines in
/// the visible page text, in document order.
pub(crate) fn accounts_from_text(text: &str) -> Vec<Account> {
    ACCOUNT_LINE
        .captures_iter(text)
        .map(|caps| {
            Account::new(
                caps[1].parse().unwrap_or(0),
                caps[2].trim(),
                caps[3].trim(),
                caps[4].to_uppercase(),
            )
        })
        .collect()
}

/// Pull the person header fields out of the page text. Each value sits on
/// the label's own line or the one after it.
pub(crate) fn person_fields_from_text(text: &str) -> (String, String, String) {
    let mut username = String::new();
    let mut person_id = String::new();
    let mut full_name = String::new();

    let lines: Vec<&str> = text.lines().collect();
    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        let upper = line.to_uppercase();

        if upper.contains("USUARIO") && username.is_empty() {
            username = find_in_line_or_next(&LONG_DIGITS, line, lines.get(i + 1));
        }

        if upper.contains("PERSONA") && !upper.contains("CUENTAS") && person_id.is_empty() {
            // The username can appear on the same line; scrub it first so its
            // digits are not mistaken for the person id.
            let scrubbed = if username.is_empty() {
                line.to_string()
            } else {
                line.replace(&username, "")
            };
            person_id = find_in_line_or_next(&DIGITS, &scrubbed, lines.get(i + 1));
        }

        if upper.contains("NOMBRE") && full_name.is_empty() {
            let after = NAME_LABEL.replace(line, "");
            if !after.trim().is_empty() {
                full_name = after.trim().to_string();
            } else if let Some(next) = lines.get(i + 1) {
                full_name = next.trim().to_string();
            }
        }
    }

    (username, person_id, full_name)
}

fn find_in_line_or_next(pattern: &Regex, line: &str, next: Option<&&str>) -> String {
    if let Some(m) = pattern.find(line) {
        return m.as_str().to_string();
    }
    if let Some(next) = next {
        if let Some(m) = pattern.find(next) {
            return m.as_str().to_string();
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_pattern_extracts_single_account() {
        let accounts = accounts_from_text("12 Energía Av. Siempre Viva 742 CONECTADO");
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].number, 12);
        assert_eq!(accounts[0].service, "Energía");
        assert_eq!(accounts[0].address, "Av. Siempre Viva 742");
        assert_eq!(accounts[0].status, "CONECTADO");
    }

    #[test]
    fn text_pattern_keeps_document_order() {
        let text = "\
            7 Energía Belgrano 120 CONECTADO\n\
            algo irrelevante\n\
            9 Gas Mitre 55 SUSPENDIDO\n";
        let accounts = accounts_from_text(text);
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].number, 7);
        assert_eq!(accounts[1].number, 9);
        assert_eq!(accounts[1].status, "SUSPENDIDO");
    }

    #[test]
    fn text_pattern_uppercases_status() {
        let accounts = accounts_from_text("3 agua Roca 42 desconectado");
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].status, "DESCONECTADO");
    }

    #[test]
    fn cell_rows_skip_headers_and_default_bad_numbers() {
        let rows = vec![
            vec!["Cta".to_string(), "Servicio".to_string()],
            vec![
                "12".to_string(),
                "Energía".to_string(),
                "Calle Falsa 123".to_string(),
                "CONECTADO".to_string(),
            ],
            vec![
                "n/a".to_string(),
                "Gas".to_string(),
                "Mitre 55".to_string(),
                "ACTIVO".to_string(),
            ],
        ];

        let accounts = accounts_from_cell_rows(&rows);
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].number, 12);
        assert_eq!(accounts[1].number, 0);
        assert_eq!(accounts[1].service, "Gas");
    }

    #[test]
    fn person_fields_same_line() {
        let text = "USUARIO 1234567890\nPERSONA 456\nNOMBRE PEREZ JUAN";
        let (username, person_id, full_name) = person_fields_from_text(text);
        assert_eq!(username, "1234567890");
        assert_eq!(person_id, "456");
        assert_eq!(full_name, "PEREZ JUAN");
    }

    #[test]
    fn person_fields_next_line() {
        let text = "USUARIO\n9876543210\nPERSONA\n77\nNOMBRE\nGOMEZ ANA";
        let (username, person_id, full_name) = person_fields_from_text(text);
        assert_eq!(username, "9876543210");
        assert_eq!(person_id, "77");
        assert_eq!(full_name, "GOMEZ ANA");
    }

    #[test]
    fn person_header_ignores_accounts_heading() {
        let text = "Cuentas de la persona\nUSUARIO 1234567890\nPERSONA 456";
        let (_, person_id, _) = person_fields_from_text(text);
        assert_eq!(person_id, "456");
    }
}
