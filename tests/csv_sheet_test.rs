use anyhow::Result;
use lead_enrich::domain::ports::SheetStore;
use lead_enrich::domain::sheet::{CellRef, RangeRef};
use lead_enrich::{CsvSheet, EnrichError};
use tempfile::TempDir;

fn sheet_with(dir: &TempDir, content: &str) -> Result<CsvSheet> {
    let path = dir.path().join("leads.csv");
    std::fs::write(&path, content)?;
    Ok(CsvSheet::new(path))
}

#[tokio::test]
async fn test_read_names_column() -> Result<()> {
    let dir = TempDir::new()?;
    let sheet = sheet_with(&dir, "#,Name\n1,Jane Doe\n2,\n3,John Smith\n")?;

    let rows = sheet.read(&RangeRef::parse("Sheet1!B2:B")?).await?;

    assert_eq!(
        rows,
        vec![
            vec!["Jane Doe".to_string()],
            vec![String::new()],
            vec!["John Smith".to_string()],
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_read_bounded_range_pads_short_rows() -> Result<()> {
    let dir = TempDir::new()?;
    let sheet = sheet_with(&dir, "a,b,c\nd\ne,f,g\n")?;

    let rows = sheet.read(&RangeRef::parse("Sheet1!A1:C2")?).await?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1], vec!["d".to_string(), String::new(), String::new()]);
    Ok(())
}

#[tokio::test]
async fn test_write_grows_grid_and_keeps_existing_cells() -> Result<()> {
    let dir = TempDir::new()?;
    let sheet = sheet_with(&dir, "#,Name\n1,Jane Doe\n")?;

    sheet.write(&CellRef::new("Sheet1", "AF", 3), "Active").await?;

    let rows = sheet.read(&RangeRef::parse("Sheet1!A1:AF3")?).await?;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1][1], "Jane Doe");
    assert_eq!(rows[2][31], "Active");
    assert_eq!(rows[2][0], "");
    Ok(())
}

#[tokio::test]
async fn test_last_write_wins() -> Result<()> {
    let dir = TempDir::new()?;
    let sheet = sheet_with(&dir, "#,Name\n1,Jane Doe\n")?;
    let cell = CellRef::new("Sheet1", "C", 2);

    sheet.write(&cell, "Acme").await?;
    sheet.write(&cell, "Acme Pty Ltd").await?;

    let rows = sheet.read(&RangeRef::parse("Sheet1!C2:C2")?).await?;
    assert_eq!(rows, vec![vec!["Acme Pty Ltd".to_string()]]);
    Ok(())
}

#[tokio::test]
async fn test_write_creates_missing_file() -> Result<()> {
    let dir = TempDir::new()?;
    let sheet = CsvSheet::new(dir.path().join("new.csv"));

    sheet.write(&CellRef::new("Sheet1", "B", 2), "x").await?;

    let content = std::fs::read_to_string(sheet.path())?;
    assert_eq!(content.lines().nth(1), Some(",x"));
    Ok(())
}

#[tokio::test]
async fn test_write_rejects_non_letter_column() -> Result<()> {
    let dir = TempDir::new()?;
    let sheet = sheet_with(&dir, "#,Name\n1,Jane Doe\n")?;

    let err = sheet
        .write(&CellRef::new("Sheet1", "7", 2), "x")
        .await
        .unwrap_err();
    assert!(matches!(err, EnrichError::SheetError { message } if message.contains("invalid column")));

    let content = std::fs::read_to_string(sheet.path())?;
    assert_eq!(content, "#,Name\n1,Jane Doe\n");
    Ok(())
}

#[tokio::test]
async fn test_read_missing_file_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let sheet = CsvSheet::new(dir.path().join("missing.csv"));

    let err = sheet
        .read(&RangeRef::parse("Sheet1!B2:B")?)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrichError::CsvError(_)));
    Ok(())
}
