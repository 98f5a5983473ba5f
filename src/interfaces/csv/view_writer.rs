//! CSV output of a reconciled penalty view.

use crate::domain::penalty::{ClassifiedKind, PenaltyView, ReconciledView};
use crate::error::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct ViewRow<'a> {
    reference: &'a str,
    classified: &'a str,
    status: &'a str,
    amount: Decimal,
    outstanding: Decimal,
    made_up_date: NaiveDate,
    due_date: NaiveDate,
    reason: &'a str,
}

impl<'a> From<&'a PenaltyView> for ViewRow<'a> {
    fn from(item: &'a PenaltyView) -> Self {
        Self {
            reference: &item.reference,
            classified: match item.classified {
                ClassifiedKind::Penalty => "penalty",
                ClassifiedKind::Other => "other",
            },
            status: item.payable_status.as_str(),
            amount: item.original_amount,
            outstanding: item.outstanding,
            made_up_date: item.made_up_date,
            due_date: item.due_date,
            reason: &item.reason,
        }
    }
}

pub struct ViewWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ViewWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_view(&mut self, view: &ReconciledView) -> Result<()> {
        for item in &view.items {
            self.writer.serialize(ViewRow::from(item))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
