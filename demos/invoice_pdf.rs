use cargobill::core::*;
use cargobill::document::{compose_invoice, render_pdf};
use chrono::NaiveDate;
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let invoice_date = NaiveDate::from_ymd_opt(2024, 6, 12).ok_or("bad date")?;
    let customer = Customer {
        store_name: "Acme Retail".into(),
        address: Some("12 Dock Road, Pasig".into()),
        tin: Some("123-456-789-000".into()),
        business_style: Some("Wholesale".into()),
        entity_abbreviation: None,
    };

    let details: Vec<BillingDetail> = [("600-1", dec!(700.00)), ("600-2", dec!(300.00))]
        .into_iter()
        .enumerate()
        .map(|(i, (waybill, amount))| {
            compute_breakdown(amount).map(|b| BillingDetail::new("B0001", waybill, &b, i as u32 + 1))
        })
        .collect::<Result<_, _>>()?;

    let mut record = BillingRecord::pending("B0001", "SI-0100", customer, invoice_date);
    BillingTotals::from_details(&details).apply_to(&mut record);

    let invoice = compose_invoice(&record, &details)?;
    let pdf = render_pdf(&invoice)?;
    std::fs::write("invoice.pdf", &pdf)?;
    println!("Wrote invoice.pdf ({} bytes, amount due {})", pdf.len(), invoice.totals.net_amount);
    Ok(())
}
