//! Console, CSV and JSON renditions of a run's result.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;

use crate::models::PersonRecord;

/// Render the console report.
pub fn render_console(person: &PersonRecord) -> String {
    let mut out = String::new();
    let rule = "=".repeat(70);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "            REPORTE DE CUENTAS - CALF ENERGIA");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "Fecha del reporte: {}",
        Local::now().format("%d/%m/%Y %H:%M")
    );
    let _ = writeln!(out, "Nombre: {}", person.full_name);
    let _ = writeln!(out, "Usuario: {}", person.username);
    let _ = writeln!(out, "Persona: {}", person.person_id);
    let _ = writeln!(out, "{rule}");

    if person.accounts.is_empty() {
        let _ = writeln!(out, "\n  No se encontraron cuentas.");
        let _ = writeln!(out, "{rule}");
        return out;
    }

    let _ = writeln!(out, "\nCuentas encontradas: {}\n", person.accounts.len());
    let _ = writeln!(
        out,
        "{:>4}  {:<10}  {:<40}  {:<15}",
        "Cta", "Servicio", "Domicilio", "Estado"
    );
    let _ = writeln!(out, "{}", "-".repeat(75));
    for account in &person.accounts {
        let _ = writeln!(
            out,
            "{:>4}  {:<10}  {:<40}  {:<15}",
            account.number, account.service, account.address, account.status
        );
    }

    for account in &person.accounts {
        if account.detail.is_empty() {
            continue;
        }
        let thin = "─".repeat(70);
        let _ = writeln!(out, "\n{thin}");
        let _ = writeln!(
            out,
            "  DETALLE CUENTA {} - {}",
            account.number, account.address
        );
        let _ = writeln!(out, "{thin}");
        for (key, value) in &account.detail.fields {
            let _ = writeln!(out, "  {key}: {value}");
        }
        for (name, rows) in &account.detail.tables {
            let _ = writeln!(out, "\n  {name}:");
            for row in rows {
                for (key, value) in row {
                    let _ = writeln!(out, "    {key}: {value}");
                }
                let _ = writeln!(out);
            }
        }
    }

    let _ = writeln!(out, "\n{rule}");
    out
}

/// JSON rendition of the result.
pub fn to_json(person: &PersonRecord) -> Result<String> {
    serde_json::to_string_pretty(person).context("Failed to serialize result")
}

/// Sectioned, `;`-separated CSV export.
pub fn write_csv(person: &PersonRecord, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    let mut w = csv::WriterBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_writer(file);

    w.write_record(["DATOS DE LA PERSONA"])?;
    w.write_record(["Campo", "Valor"])?;
    w.write_record(["Nombre", person.full_name.as_str()])?;
    w.write_record(["Usuario", person.username.as_str()])?;
    w.write_record(["Persona ID", person.person_id.as_str()])?;
    w.write_record([""])?;

    w.write_record(["CUENTAS"])?;
    w.write_record(["Nro", "Servicio", "Domicilio", "Estado"])?;
    for account in &person.accounts {
        w.write_record([
            account.number.to_string(),
            account.service.clone(),
            account.address.clone(),
            account.status.clone(),
        ])?;
    }
    w.write_record([""])?;

    for account in &person.accounts {
        if account.detail.is_empty() {
            continue;
        }
        w.write_record([format!(
            "DETALLE CUENTA {} - {}",
            account.number, account.address
        )])?;
        for (key, value) in &account.detail.fields {
            w.write_record([key, value])?;
        }
        for (name, rows) in &account.detail.tables {
            w.write_record([name.as_str()])?;
            if let Some(first) = rows.first() {
                let headers: Vec<&str> = first.keys().map(String::as_str).collect();
                w.write_record(&headers)?;
            }
            for row in rows {
                let values: Vec<&str> = row.values().map(String::as_str).collect();
                w.write_record(&values)?;
            }
        }
        w.write_record([""])?;
    }

    w.flush().context("Failed to flush CSV file")?;
    Ok(())
}
