use crate::error::{CommerceError, CommerceErrorExt};
use crate::model::{RentalReceipt, RentalRequest};
use feq_database::Database;
use feq_kernel::domain::constants::RENTAL_REQUESTS;
use feq_mailer::{Email, Mailer, escape_html};
use serde_json::json;
use tracing::{info, instrument};

fn sales_email(inbox: &str, request: &RentalRequest) -> Email {
    let optional = |value: &Option<String>| escape_html(value.as_deref().unwrap_or("-"));
    Email::new(inbox, format!("Rental request: {}", request.equipment_type.trim()))
        .reply_to(request.email.trim())
        .html(format!(
            "<h2>New rental request</h2>\
             <p><strong>Equipment:</strong> {equipment}<br>\
             <strong>Dates:</strong> {start} to {end}<br>\
             <strong>Name:</strong> {name}<br>\
             <strong>Email:</strong> {email}<br>\
             <strong>Phone:</strong> {phone}<br>\
             <strong>ZIP:</strong> {zip}</p>\
             <p>{notes}</p>",
            equipment = escape_html(request.equipment_type.trim()),
            start = request.start_date,
            end = request.end_date,
            name = escape_html(request.name.trim()),
            email = escape_html(request.email.trim()),
            phone = optional(&request.phone),
            zip = optional(&request.zip),
            notes = optional(&request.notes),
        ))
}

/// Stores the request and forwards it to sales. Email trouble does not fail the request.
#[instrument(skip_all, fields(equipment = %request.equipment_type))]
pub(crate) async fn submit(
    db: &Database,
    mailer: &Mailer,
    sales_inbox: &str,
    request: &RentalRequest,
) -> Result<RentalReceipt, CommerceError> {
    let receipt: RentalReceipt = db
        .service()
        .from(RENTAL_REQUESTS)
        .select("id")
        .insert_one(&json!({
            "equipment_type": request.equipment_type.trim(),
            "start_date": request.start_date,
            "end_date": request.end_date,
            "name": request.name.trim(),
            "email": request.email.trim().to_lowercase(),
            "phone": request.phone,
            "zip": request.zip,
            "notes": request.notes,
        }))
        .await
        .context("Storing rental request")?;

    info!(rental_id = %receipt.id, "Rental request stored");
    mailer.send_or_log(&sales_email(sales_inbox, request)).await;
    Ok(receipt)
}
