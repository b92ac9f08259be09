use fintrack_core::UserId;
use fintrack_debts::{
    Debt, DebtAggregate, DebtId, DebtPayment, DebtPaymentId, DebtPaymentProps, DebtProps,
};

use super::{read_meta, with_meta};
use crate::repository::{
    AggregateMapper, Column, Criterion, RepositoryError, Row, SqlValue, TableSpec,
};

const DEBT_COLUMNS: &[Column] = &[
    Column::text("id"),
    Column::text("user_id"),
    Column::text("lender"),
    Column::text("purpose"),
    Column::text("amount"),
    Column::text("currency"),
    Column::text("rate"),
    Column::text("due_date"),
    Column::text("created_at"),
    Column::text("updated_at"),
];

const PAYMENT_COLUMNS: &[Column] = &[
    Column::text("id"),
    Column::text("user_id"),
    Column::text("name"),
    Column::text("description"),
    Column::text("amount"),
    Column::text("currency"),
    Column::text("paid_at"),
    Column::text("created_at"),
    Column::text("updated_at"),
];

pub static DEBT_SPEC: TableSpec = TableSpec {
    root_table: "debts",
    root_columns: DEBT_COLUMNS,
    sortable: &["lender", "due_date", "created_at", "updated_at"],
    child_table: "debt_payments",
    child_columns: PAYMENT_COLUMNS,
    link_table: "debt_debt_payments",
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebtFilter {
    pub user_id: Option<UserId>,
    pub lender: Option<String>,
}

impl DebtFilter {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DebtMapper;

impl AggregateMapper for DebtMapper {
    type Aggregate = DebtAggregate;
    type Filter = DebtFilter;

    fn spec(&self) -> &TableSpec {
        &DEBT_SPEC
    }

    fn root_to_row(&self, debt: &Debt) -> Row {
        let props = debt.props();
        with_meta(Row::new(), debt.meta())
            .with("user_id", SqlValue::text(props.user_id.to_string()))
            .with("lender", SqlValue::text(props.lender.clone()))
            .with("purpose", SqlValue::opt_text(props.purpose.clone()))
            .with_money("amount", "currency", Some(&props.amount))
            .with("rate", SqlValue::decimal(props.rate))
            .with("due_date", SqlValue::opt_date(props.due_date))
    }

    fn root_from_row(&self, row: &Row) -> Result<Debt, RepositoryError> {
        let meta = read_meta::<DebtId>(row)?;
        let props = DebtProps {
            user_id: UserId::from_uuid(row.uuid("user_id")?),
            lender: row.string("lender")?,
            purpose: row.opt_string("purpose")?,
            amount: row.money("amount", "currency")?,
            rate: row.decimal("rate")?,
            due_date: row.opt_date("due_date")?,
        };
        Ok(Debt::restore(meta, props))
    }

    fn child_to_row(&self, payment: &DebtPayment) -> Row {
        let props = payment.props();
        with_meta(Row::new(), payment.meta())
            .with("user_id", SqlValue::text(props.user_id.to_string()))
            .with("name", SqlValue::text(props.name.clone()))
            .with("description", SqlValue::opt_text(props.description.clone()))
            .with_money("amount", "currency", Some(&props.amount))
            .with("paid_at", SqlValue::timestamp(props.paid_at))
    }

    fn child_from_row(&self, row: &Row) -> Result<DebtPayment, RepositoryError> {
        let meta = read_meta::<DebtPaymentId>(row)?;
        let props = DebtPaymentProps {
            user_id: UserId::from_uuid(row.uuid("user_id")?),
            name: row.string("name")?,
            description: row.opt_string("description")?,
            amount: row.money("amount", "currency")?,
            paid_at: row.timestamp("paid_at")?,
        };
        Ok(DebtPayment::restore(meta, props))
    }

    fn filter_criteria(&self, filter: &DebtFilter) -> Vec<Criterion> {
        let mut criteria = Vec::new();
        if let Some(user_id) = filter.user_id {
            criteria.push(Criterion::equals("user_id", SqlValue::text(user_id.to_string())));
        }
        if let Some(lender) = &filter.lender {
            criteria.push(Criterion::equals("lender", SqlValue::text(lender.clone())));
        }
        criteria
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fintrack_core::{AggregateRoot, Currency, CurrencyValue, Entity};
    use rust_decimal_macros::dec;

    #[test]
    fn debt_rows_keep_rate_and_payments() {
        let debt = DebtAggregate::new_debt(
            DebtProps {
                user_id: UserId::new(),
                lender: "Bank".to_string(),
                purpose: None,
                amount: CurrencyValue::new(dec!(10000), Currency::Usd),
                rate: dec!(3.75),
                due_date: None,
            },
            Some(CurrencyValue::new(dec!(2500), Currency::Usd)),
        )
        .unwrap();

        let root = DebtMapper.root_to_row(debt.root());
        assert_eq!(root.text("rate").unwrap(), "3.75");

        let children: Vec<Row> = debt
            .children()
            .items()
            .map(|p| DebtMapper.child_to_row(p))
            .collect();
        let restored = DebtMapper.load(&root, &children).unwrap();
        assert_eq!(restored.debt().props(), debt.debt().props());
        assert_eq!(restored.current_paid_amount().unwrap().amount(), dec!(2500));
        let payment = restored.payments().items().next().unwrap();
        assert_eq!(payment.id(), debt.payments().items().next().unwrap().id());
    }
}
