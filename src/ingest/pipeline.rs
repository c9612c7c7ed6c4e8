// src/ingest/pipeline.rs
//! Ingestion orchestration for one uploaded workbook
//!
//! Everything a run needs (header map, image map, staged inserts, error
//! list) is threaded through one `IngestContext`, so concurrent uploads run
//! as fully independent pipeline instances. New records are deferred to one
//! batch insert at the end; a header-detection failure aborts before any
//! record is touched.

use sqlx::SqlitePool;
use std::path::Path;
use tracing::{info, warn};

use super::fallback;
use super::fields::{self, CandidateDraft};
use super::header::{locate_header, HeaderMap};
use super::images::{extract_row_images, ImageRowMap};
use super::reconcile::{coerce_number, decide, ExistingCandidate, RowDecision};
use super::workbook::{parse_workbook, WorkbookError};
use crate::common::generate_candidate_id;
use crate::services::PhotoStore;

/// Per-upload outcome: number of accepted rows (inserts plus photo patches)
/// and the human-readable skip/error list
#[derive(Debug)]
pub struct IngestReport {
    pub added: i64,
    pub errors: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("could not read the uploaded spreadsheet: {0}")]
    Workbook(#[from] WorkbookError),
    #[error("headers not found in the uploaded sheet")]
    HeadersNotFound,
    #[error("database error during import")]
    Db(#[from] sqlx::Error),
}

/// A fully coerced record staged for the final batch insert
struct StagedCandidate {
    id: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    experience_years: f64,
    previous_experience: Option<String>,
    age: f64,
    photo_path: Option<String>,
}

/// State threaded through one ingestion run
struct IngestContext {
    header: HeaderMap,
    image_map: ImageRowMap,
    staged: Vec<StagedCandidate>,
    patched: i64,
    errors: Vec<String>,
}

/// Run the full ingestion pipeline over one uploaded workbook file.
///
/// The caller owns the temp file's lifecycle; this function never deletes it.
pub async fn run_import(
    db: &SqlitePool,
    photos: &PhotoStore,
    workbook_path: &Path,
    created_by: &str,
) -> Result<IngestReport, ImportError> {
    let workbook = parse_workbook(workbook_path)?;

    // Header first: its failure must abort before anything is persisted,
    // including image blobs
    let header = locate_header(&workbook.rows).ok_or(ImportError::HeadersNotFound)?;
    info!(
        header_row = header.row_index,
        columns = header.columns.len(),
        "Located header row"
    );

    let image_map = extract_row_images(&workbook.images, photos).await;
    if !image_map.is_empty() {
        info!(image_count = image_map.len(), "Extracted embedded images");
    }

    let mut ctx = IngestContext {
        header,
        image_map,
        staged: Vec::new(),
        patched: 0,
        errors: Vec::new(),
    };

    let data_rows = &workbook.rows[ctx.header.row_index + 1..];
    for (offset, row) in data_rows.iter().enumerate() {
        // Images anchor to native sheet coordinates, not the data-row index
        let sheet_row = ctx.header.row_index + 1 + offset;
        process_row(db, &mut ctx, row, sheet_row).await?;
    }

    let inserted = insert_staged(db, &ctx.staged, created_by).await?;

    info!(
        inserted = inserted,
        patched = ctx.patched,
        skipped = ctx.errors.len(),
        "Workbook import finished"
    );

    Ok(IngestReport {
        added: inserted + ctx.patched,
        errors: ctx.errors,
    })
}

async fn process_row(
    db: &SqlitePool,
    ctx: &mut IngestContext,
    row: &[calamine::Data],
    sheet_row: usize,
) -> Result<(), sqlx::Error> {
    let row_blank = fields::row_is_blank(row);
    let mut draft = fields::map_row(&ctx.header, row);

    let text = fallback::row_text(row);
    if fallback::should_attempt(&draft, &text) {
        fallback::apply(&mut draft, &text);
    }

    // The store-uniqueness rule holds inside one batch too: a row staged
    // earlier in this workbook counts as existing even though inserts are
    // deferred. Photo merging only applies to stored records, so a staged
    // hit always resolves as a plain duplicate.
    let existing = match &draft.email {
        Some(email) => {
            let staged_hit = ctx
                .staged
                .iter()
                .find(|c| c.email.as_deref() == Some(email.as_str()));
            match staged_hit {
                Some(staged) => Some(ExistingCandidate {
                    id: staged.id.clone(),
                    has_photo: true,
                }),
                None => find_existing(db, email).await?,
            }
        }
        None => None,
    };

    let has_image = ctx.image_map.contains_key(&(sheet_row as u32));

    match decide(&draft, row_blank, existing.as_ref(), has_image) {
        RowDecision::Insert => stage_insert(ctx, draft, sheet_row),
        RowDecision::PatchPhoto { candidate_id } => {
            // The decision only takes this branch when the row has an image
            if let Some(img) = ctx.image_map.get(&(sheet_row as u32)) {
                sqlx::query("UPDATE candidates SET photo_path = ? WHERE id = ?")
                    .bind(&img.path)
                    .bind(&candidate_id)
                    .execute(db)
                    .await?;
                info!(
                    candidate_id = %candidate_id,
                    photo_path = %img.path,
                    "Patched photo onto existing candidate"
                );
                ctx.patched += 1;
            } else {
                warn!(row = sheet_row, "Photo patch decided for a row without an image");
            }
        }
        RowDecision::SkipBlank | RowDecision::SkipNoise => {}
        RowDecision::SkipMissingFields { found } => {
            let found_desc = if found.is_empty() {
                "none".to_string()
            } else {
                found.join(", ")
            };
            ctx.errors.push(format!(
                "Row {}: name and an email or phone are required (found: {})",
                sheet_row + 1,
                found_desc
            ));
        }
        RowDecision::SkipDuplicate { email } => {
            ctx.errors
                .push(format!("Row {}: email already exists ({})", sheet_row + 1, email));
        }
    }

    Ok(())
}

fn stage_insert(ctx: &mut IngestContext, draft: CandidateDraft, sheet_row: usize) {
    let photo_path = ctx
        .image_map
        .get(&(sheet_row as u32))
        .map(|img| img.path.clone());

    ctx.staged.push(StagedCandidate {
        id: generate_candidate_id(),
        name: draft.name.unwrap_or_default(),
        email: draft.email,
        phone: draft.phone,
        experience_years: coerce_number(draft.experience_years.as_deref()),
        previous_experience: draft.previous_experience,
        age: coerce_number(draft.age.as_deref()),
        photo_path,
    });
}

async fn find_existing(db: &SqlitePool, email: &str) -> Result<Option<ExistingCandidate>, sqlx::Error> {
    let row: Option<(String, Option<String>)> =
        sqlx::query_as("SELECT id, photo_path FROM candidates WHERE email = ?")
            .bind(email)
            .fetch_optional(db)
            .await?;

    Ok(row.map(|(id, photo_path)| ExistingCandidate {
        id,
        has_photo: photo_path.map_or(false, |p| !p.is_empty()),
    }))
}

/// One batch insert for all staged records, bounding store round-trips
async fn insert_staged(
    db: &SqlitePool,
    staged: &[StagedCandidate],
    created_by: &str,
) -> Result<i64, sqlx::Error> {
    if staged.is_empty() {
        return Ok(0);
    }

    let now = chrono::Utc::now().to_rfc3339();

    let placeholders = staged
        .iter()
        .map(|_| "(?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)")
        .collect::<Vec<_>>()
        .join(", ");
    let query = format!(
        r#"
        INSERT INTO candidates
            (id, name, email, phone, experience_years, previous_experience, age, photo_path, status, created_by, created_at)
        VALUES {}
        "#,
        placeholders
    );

    let mut query_builder = sqlx::query(&query);
    for candidate in staged {
        query_builder = query_builder
            .bind(&candidate.id)
            .bind(&candidate.name)
            .bind(&candidate.email)
            .bind(&candidate.phone)
            .bind(candidate.experience_years)
            .bind(&candidate.previous_experience)
            .bind(candidate.age)
            .bind(&candidate.photo_path)
            .bind(created_by)
            .bind(&now);
    }

    let result = query_builder.execute(db).await?;
    Ok(result.rows_affected() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::generate_raw_id;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::io::Write;
    use std::path::PathBuf;
    use zip::write::FileOptions;

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn png_bytes(payload_len: usize) -> Vec<u8> {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(PNG_MAGIC.len() + payload_len, 0xCD);
        bytes
    }

    fn column_letter(index: usize) -> char {
        (b'A' + index as u8) as char
    }

    /// Hand-assemble a minimal xlsx: inline-string cells plus optionally one
    /// embedded image anchored at a sheet row
    fn build_workbook(
        path: &PathBuf,
        rows: &[&[&str]],
        image: Option<(u32, &[u8], &str)>,
    ) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let opts: FileOptions = FileOptions::default();

        let content_types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Default Extension="png" ContentType="image/png"/>
<Default Extension="jpg" ContentType="image/jpeg"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#,
        );

        zip.start_file("[Content_Types].xml", opts).unwrap();
        zip.write_all(content_types.as_bytes()).unwrap();

        zip.start_file("_rels/.rels", opts).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#,
        )
        .unwrap();

        zip.start_file("xl/workbook.xml", opts).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
        )
        .unwrap();

        zip.start_file("xl/_rels/workbook.xml.rels", opts).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#,
        )
        .unwrap();

        let mut sheet = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        for (row_idx, cells) in rows.iter().enumerate() {
            sheet.push_str(&format!(r#"<row r="{}">"#, row_idx + 1));
            for (col_idx, value) in cells.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                sheet.push_str(&format!(
                    r#"<c r="{}{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    column_letter(col_idx),
                    row_idx + 1,
                    value
                ));
            }
            sheet.push_str("</row>");
        }
        sheet.push_str("</sheetData></worksheet>");

        zip.start_file("xl/worksheets/sheet1.xml", opts).unwrap();
        zip.write_all(sheet.as_bytes()).unwrap();

        if let Some((anchor_row, bytes, ext)) = image {
            zip.start_file("xl/drawings/drawing1.xml", opts).unwrap();
            zip.write_all(
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?>
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<xdr:oneCellAnchor>
<xdr:from><xdr:col>5</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>9525</xdr:rowOff></xdr:from>
<xdr:ext cx="914400" cy="914400"/>
<xdr:pic>
<xdr:nvPicPr><xdr:cNvPr id="1" name="Picture 1"/><xdr:cNvPicPr/></xdr:nvPicPr>
<xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill>
<xdr:spPr/>
</xdr:pic>
<xdr:clientData/>
</xdr:oneCellAnchor>
</xdr:wsDr>"#,
                    anchor_row
                )
                .as_bytes(),
            )
            .unwrap();

            zip.start_file("xl/drawings/_rels/drawing1.xml.rels", opts)
                .unwrap();
            zip.write_all(
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.{}"/>
</Relationships>"#,
                    ext
                )
                .as_bytes(),
            )
            .unwrap();

            zip.start_file(format!("xl/media/image1.{}", ext), opts)
                .unwrap();
            zip.write_all(bytes).unwrap();
        }

        zip.finish().unwrap();
    }

    async fn test_db() -> SqlitePool {
        // In-memory sqlite: a single connection keeps every query on one DB
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::common::migrations::run_migrations(&pool).await.unwrap();
        pool
    }

    struct Fixture {
        dir: PathBuf,
        photos: PhotoStore,
        workbook_path: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("import-test-{}", generate_raw_id(8)));
            std::fs::create_dir_all(&dir).unwrap();
            Fixture {
                photos: PhotoStore::new(dir.join("photos")),
                workbook_path: dir.join("upload.xlsx"),
                dir,
            }
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    async fn candidate_count(db: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM candidates")
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_import_with_header_offset_and_anchored_photo() {
        let fx = Fixture::new();
        let db = test_db().await;

        // Header on sheet row index 2, one data row, image anchored at the
        // data row's native sheet position
        build_workbook(
            &fx.workbook_path,
            &[
                &["Acme Recruiting 2024"],
                &[],
                &["Name", "Email", "Phone"],
                &["Alice", "alice@x.com", "5551234"],
            ],
            Some((3, &png_bytes(64), "png")),
        );

        let report = run_import(&db, &fx.photos, &fx.workbook_path, "U_TEST01")
            .await
            .unwrap();

        assert_eq!(report.added, 1);
        assert!(report.errors.is_empty(), "errors: {:?}", report.errors);

        let (name, email, photo_path, created_by): (String, String, Option<String>, String) =
            sqlx::query_as(
                "SELECT name, email, photo_path, created_by FROM candidates WHERE email = ?",
            )
            .bind("alice@x.com")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(name, "Alice");
        assert_eq!(email, "alice@x.com");
        assert_eq!(created_by, "U_TEST01");

        let photo_path = photo_path.expect("imported candidate must carry the extracted photo");
        assert!(photo_path.starts_with("/uploads/photos/"));
        assert!(photo_path.ends_with(".png"));
        let filename = photo_path.strip_prefix("/uploads/photos/").unwrap();
        assert!(fx.photos.path_for(filename).exists());
    }

    #[tokio::test]
    async fn test_missing_header_aborts_with_nothing_persisted() {
        let fx = Fixture::new();
        let db = test_db().await;

        build_workbook(
            &fx.workbook_path,
            &[&["Quarterly notes"], &["nothing tabular here"]],
            Some((1, &png_bytes(64), "png")),
        );

        let result = run_import(&db, &fx.photos, &fx.workbook_path, "U_TEST01").await;

        assert!(matches!(result, Err(ImportError::HeadersNotFound)));
        assert_eq!(candidate_count(&db).await, 0);
        // Header failure short-circuits before any image blob is written
        assert!(!fx.photos.base_dir().exists());
    }

    #[tokio::test]
    async fn test_reupload_is_idempotent() {
        let fx = Fixture::new();
        let db = test_db().await;

        build_workbook(
            &fx.workbook_path,
            &[
                &["Name", "Email"],
                &["Alice", "alice@x.com"],
                &["Bob", "bob@y.org"],
            ],
            None,
        );

        let first = run_import(&db, &fx.photos, &fx.workbook_path, "U_TEST01")
            .await
            .unwrap();
        assert_eq!(first.added, 2);
        assert!(first.errors.is_empty());

        let second = run_import(&db, &fx.photos, &fx.workbook_path, "U_TEST01")
            .await
            .unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.errors.len(), 2);
        assert!(second.errors.iter().all(|e| e.contains("already exists")));
        assert_eq!(candidate_count(&db).await, 2);
    }

    #[tokio::test]
    async fn test_row_missing_contact_is_reported_not_inserted() {
        let fx = Fixture::new();
        let db = test_db().await;

        build_workbook(
            &fx.workbook_path,
            &[
                &["Name", "Email", "Phone"],
                &["Carol", "", ""],
                &["Dan", "dan@z.io", ""],
            ],
            None,
        );

        let report = run_import(&db, &fx.photos, &fx.workbook_path, "U_TEST01")
            .await
            .unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("Row 2"));
        assert!(report.errors[0].contains("name"));
        assert_eq!(candidate_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_photoless_record_gets_photo_patched() {
        let fx = Fixture::new();
        let db = test_db().await;

        sqlx::query(
            r#"
            INSERT INTO candidates (id, name, email, status, created_by, created_at)
            VALUES ('C_SEED01', 'Alice', 'alice@x.com', 'pending', 'U_SEED', '2024-01-01T00:00:00Z')
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        build_workbook(
            &fx.workbook_path,
            &[&["Name", "Email"], &["Alice", "alice@x.com"]],
            Some((1, &png_bytes(64), "png")),
        );

        let report = run_import(&db, &fx.photos, &fx.workbook_path, "U_TEST01")
            .await
            .unwrap();

        // Counted toward the accepted tally but not inserted as a new row
        assert_eq!(report.added, 1);
        assert!(report.errors.is_empty());
        assert_eq!(candidate_count(&db).await, 1);

        let photo_path: Option<String> =
            sqlx::query_scalar("SELECT photo_path FROM candidates WHERE id = 'C_SEED01'")
                .fetch_one(&db)
                .await
                .unwrap();
        assert!(photo_path.unwrap().ends_with(".png"));
    }

    #[tokio::test]
    async fn test_duplicate_email_within_one_batch() {
        let fx = Fixture::new();
        let db = test_db().await;

        build_workbook(
            &fx.workbook_path,
            &[
                &["Name", "Email"],
                &["Alice", "alice@x.com"],
                &["Alice Again", "alice@x.com"],
            ],
            None,
        );

        let report = run_import(&db, &fx.photos, &fx.workbook_path, "U_TEST01")
            .await
            .unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("already exists"));
        assert_eq!(candidate_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_composite_text_row_recovers_through_fallback() {
        let fx = Fixture::new();
        let db = test_db().await;

        // The second data row collapses everything into one labelled cell;
        // the blob lands in the Name column and is long enough to trip the
        // mis-mapped-name override
        build_workbook(
            &fx.workbook_path,
            &[
                &["Name", "Email", "Phone"],
                &["Alice", "alice@x.com", "5551234"],
                &["Name: Jane Doe Age: 29 University: Example State University Phone: 555-1234"],
            ],
            None,
        );

        let report = run_import(&db, &fx.photos, &fx.workbook_path, "U_TEST01")
            .await
            .unwrap();

        assert_eq!(report.added, 2);
        assert!(report.errors.is_empty(), "errors: {:?}", report.errors);

        let (name, phone, age): (String, Option<String>, Option<f64>) = sqlx::query_as(
            "SELECT name, phone, age FROM candidates WHERE name = 'Jane Doe'",
        )
        .fetch_one(&db)
        .await
        .unwrap();
        assert_eq!(name, "Jane Doe");
        assert_eq!(phone.as_deref(), Some("555-1234"));
        assert_eq!(age, Some(29.0));
    }

    #[tokio::test]
    async fn test_blank_and_noise_rows_skip_silently() {
        let fx = Fixture::new();
        let db = test_db().await;

        // The footer row's text sits outside the name/email columns, which
        // is what the boilerplate rule keys on
        build_workbook(
            &fx.workbook_path,
            &[
                &["Name", "Email", "Phone"],
                &["Alice", "alice@x.com", "5551234"],
                &[],
                &["", "", "Generated by Acme Sheets"],
            ],
            None,
        );

        let report = run_import(&db, &fx.photos, &fx.workbook_path, "U_TEST01")
            .await
            .unwrap();

        assert_eq!(report.added, 1);
        assert!(report.errors.is_empty(), "errors: {:?}", report.errors);
    }
}
