use crate::ast::{OrqlExp, OrqlOperand};
use crate::schema::ColumnInfo;
use crate::sql::{SqlColumn, SqlExp, SqlOperand};

/// Lower a filter. Columns are qualified with `qualifier` when one is given.
pub(crate) fn compile_exp(exp: &OrqlExp, qualifier: Option<&str>) -> SqlExp {
    match exp {
        OrqlExp::Compare { left, op, right } => SqlExp::Compare {
            left: column(left, qualifier),
            op: *op,
            right: match right {
                OrqlOperand::Column(c) => SqlOperand::Column(column(c, qualifier)),
                OrqlOperand::Param(name) => SqlOperand::Param(name.clone()),
                OrqlOperand::Value(value) => SqlOperand::Value(value.clone()),
            },
        },
        OrqlExp::And(left, right) => SqlExp::And(
            Box::new(compile_exp(left, qualifier)),
            Box::new(compile_exp(right, qualifier)),
        ),
        OrqlExp::Or(left, right) => SqlExp::Or(
            Box::new(compile_exp(left, qualifier)),
            Box::new(compile_exp(right, qualifier)),
        ),
        OrqlExp::Nest(inner) => SqlExp::Nest(Box::new(compile_exp(inner, qualifier))),
    }
}

fn column(column: &ColumnInfo, qualifier: Option<&str>) -> SqlColumn {
    match qualifier {
        Some(qualifier) => SqlColumn::qualified(&column.field, qualifier),
        None => SqlColumn::bare(&column.field),
    }
}
