use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};

use super::InvoiceDocument;
use crate::core::BillingError;

/// A4 portrait in points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 9;
const LEADING: i64 = 13;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

/// Render a composed invoice as a PDF, one monospaced text line per layout
/// line, paginated on A4.
///
/// Courier keeps the text layout's columns aligned. Text is written in
/// WinAnsiEncoding; characters outside it print as `?`.
pub fn render_pdf(invoice: &InvoiceDocument) -> Result<Vec<u8>, BillingError> {
    let lines = invoice.text_lines();
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for chunk in lines.chunks(LINES_PER_PAGE.max(1)) {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("TL", vec![LEADING.into()]),
            Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()]),
        ];
        for line in chunk {
            operations.push(Operation::new("Tj", vec![win_ansi(line)]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations }
            .encode()
            .map_err(|e| BillingError::Document(format!("failed to encode page content: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info = doc_info(&mut doc, &format!("Service Invoice {}", invoice.si_number));
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info);
    doc.compress();

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| BillingError::Document(format!("failed to save PDF: {e}")))?;
    Ok(output)
}

fn doc_info(doc: &mut Document, title: &str) -> Object {
    Object::Reference(doc.add_object(dictionary! {
        "Title" => win_ansi(title),
        "Producer" => Object::string_literal("cargobill"),
    }))
}

/// Encode text for a WinAnsiEncoding Type1 font.
fn win_ansi(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '\u{20ac}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            _ => b'?',
        })
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BillingDetail, BillingRecord, BillingTotals, Customer, compute_breakdown};
    use crate::document::compose_invoice;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn invoice(lines: u32) -> InvoiceDocument {
        let details: Vec<BillingDetail> = (1..=lines)
            .map(|i| {
                BillingDetail::new(
                    "B0001",
                    format!("100-{i}"),
                    &compute_breakdown(dec!(125.50)).unwrap(),
                    i,
                )
            })
            .collect();
        let mut rec = BillingRecord::pending(
            "B0001",
            "SI-0001",
            Customer::new("ACME"),
            NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(),
        );
        BillingTotals::from_details(&details).apply_to(&mut rec);
        compose_invoice(&rec, &details).unwrap()
    }

    #[test]
    fn renders_loadable_pdf() {
        let bytes = render_pdf(&invoice(3)).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn long_invoices_paginate() {
        let inv = invoice(120);
        let expected = inv.text_lines().len().div_ceil(LINES_PER_PAGE);
        let doc = Document::load_mem(&render_pdf(&inv).unwrap()).unwrap();
        assert_eq!(doc.get_pages().len(), expected);
        assert!(expected > 1);
    }

    #[test]
    fn text_encoded_as_win_ansi() {
        let Object::String(bytes, _) = win_ansi("Peña Café \u{20ac}5 \u{4e2d}") else {
            panic!("expected a string object");
        };
        assert_eq!(bytes, b"Pe\xf1a Caf\xe9 \x805 ?".to_vec());
    }
}
