//! Renders the SQL tree as text.

use std::fmt;
use std::sync::Arc;

use super::ast::*;
use crate::ast::{ExpOp, Literal};

/// Turns a parameter name into its placeholder text.
pub type ParamTemplate = dyn Fn(&str) -> String + Send + Sync;

/// SQL text generator.
///
/// Keywords are lowercase. Parameters are rendered through a template,
/// `$name` by default.
#[derive(Clone)]
pub struct SqlGenerator {
    param_template: Arc<ParamTemplate>,
}

impl Default for SqlGenerator {
    fn default() -> Self {
        Self {
            param_template: Arc::new(|name: &str| format!("${}", name)),
        }
    }
}

impl fmt::Debug for SqlGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlGenerator").finish_non_exhaustive()
    }
}

impl SqlGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom placeholder, e.g. `#{name}` or `:name`.
    pub fn with_param_template<F>(template: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            param_template: Arc::new(template),
        }
    }

    pub fn placeholder(&self, name: &str) -> String {
        (self.param_template)(name)
    }

    pub fn generate(&self, statement: &SqlStatement) -> String {
        statement.to_sql_with(self)
    }

    fn write_query(&self, query: &SqlQuery, sql: &mut String) {
        sql.push_str("select ");
        let select: Vec<String> = query.select.iter().map(|s| self.select_item(s)).collect();
        sql.push_str(&select.join(", "));

        sql.push_str(" from ");
        match &query.from {
            SqlFrom::Table { name, alias } => {
                sql.push_str(name);
                if let Some(alias) = alias {
                    sql.push_str(" as ");
                    sql.push_str(alias);
                }
            }
            SqlFrom::Subquery { query, alias } => {
                sql.push('(');
                self.write_query(query, sql);
                sql.push_str(") as ");
                sql.push_str(alias);
            }
        }

        for join in &query.joins {
            sql.push_str(match join.kind {
                JoinKind::Inner => " inner join ",
                JoinKind::Left => " left join ",
            });
            sql.push_str(&join.table);
            sql.push_str(" as ");
            sql.push_str(&join.alias);
            sql.push_str(" on ");
            self.write_exp(&join.on, sql);
        }

        if !query.filters.is_empty() {
            sql.push_str(" where ");
            let many = query.filters.len() > 1;
            for (i, filter) in query.filters.iter().enumerate() {
                if i > 0 {
                    sql.push_str(" and ");
                }
                // Or groups keep their meaning when and-ed with other filters
                if many && matches!(filter, SqlExp::Or(_, _)) {
                    sql.push('(');
                    self.write_exp(filter, sql);
                    sql.push(')');
                } else {
                    self.write_exp(filter, sql);
                }
            }
        }

        if !query.orders.is_empty() {
            sql.push_str(" order by ");
            let orders: Vec<String> = query
                .orders
                .iter()
                .flat_map(|order| {
                    order
                        .columns
                        .iter()
                        .map(move |c| format!("{} {}", column_ref(c), order.sort.as_sql()))
                })
                .collect();
            sql.push_str(&orders.join(", "));
        }

        if query.limit_one {
            sql.push_str(" limit 1");
        } else if query.page {
            sql.push_str(&format!(
                " limit {}, {}",
                self.placeholder("offset"),
                self.placeholder("limit")
            ));
        }
    }

    fn select_item(&self, item: &SqlSelect) -> String {
        match item {
            SqlSelect::All => "*".to_string(),
            SqlSelect::Count(column) => format!("count({})", column_ref(column)),
            SqlSelect::Column(column) => match &column.alias {
                Some(alias) => format!("{} as {}", column_ref(column), alias),
                None => column_ref(column),
            },
        }
    }

    fn write_insert(&self, insert: &SqlInsert, sql: &mut String) {
        let params: Vec<String> = insert.params.iter().map(|p| self.placeholder(p)).collect();
        sql.push_str(&format!(
            "insert into {} ({}) values ({})",
            insert.table,
            insert.columns.join(", "),
            params.join(", ")
        ));
    }

    fn write_update(&self, update: &SqlUpdate, sql: &mut String) {
        let set: Vec<String> = update
            .set
            .iter()
            .map(|a| format!("{} = {}", a.column, self.placeholder(&a.param)))
            .collect();
        sql.push_str(&format!("update {} set {}", update.table, set.join(", ")));
        if let Some(filter) = &update.filter {
            sql.push_str(" where ");
            self.write_exp(filter, sql);
        }
    }

    fn write_delete(&self, delete: &SqlDelete, sql: &mut String) {
        sql.push_str("delete from ");
        sql.push_str(&delete.table);
        if let Some(filter) = &delete.filter {
            sql.push_str(" where ");
            self.write_exp(filter, sql);
        }
    }

    fn write_exp(&self, exp: &SqlExp, sql: &mut String) {
        match exp {
            SqlExp::And(left, right) => {
                self.write_exp(left, sql);
                sql.push_str(" and ");
                self.write_exp(right, sql);
            }
            SqlExp::Or(left, right) => {
                self.write_exp(left, sql);
                sql.push_str(" or ");
                self.write_exp(right, sql);
            }
            SqlExp::Nest(inner) => {
                sql.push('(');
                self.write_exp(inner, sql);
                sql.push(')');
            }
            SqlExp::Compare { left, op, right } => {
                sql.push_str(&column_ref(left));
                match (op, right) {
                    (ExpOp::Eq, SqlOperand::Value(Literal::Null)) => sql.push_str(" is null"),
                    (ExpOp::Ne, SqlOperand::Value(Literal::Null)) => sql.push_str(" is not null"),
                    (op, right) => {
                        sql.push(' ');
                        sql.push_str(op.as_sql());
                        sql.push(' ');
                        match right {
                            SqlOperand::Column(column) => sql.push_str(&column_ref(column)),
                            SqlOperand::Param(name) => sql.push_str(&self.placeholder(name)),
                            SqlOperand::Value(value) => sql.push_str(&value.to_string()),
                        }
                    }
                }
            }
        }
    }
}

fn column_ref(column: &SqlColumn) -> String {
    match &column.qualifier {
        Some(qualifier) => format!("{}.{}", qualifier, column.name),
        None => column.name.clone(),
    }
}

/// Trait for converting SQL nodes to text.
pub trait ToSql {
    fn to_sql_with(&self, generator: &SqlGenerator) -> String;

    /// Render with `$name` placeholders.
    fn to_sql(&self) -> String {
        self.to_sql_with(&SqlGenerator::default())
    }
}

impl ToSql for SqlStatement {
    fn to_sql_with(&self, generator: &SqlGenerator) -> String {
        let mut sql = String::new();
        match self {
            SqlStatement::Query(query) => generator.write_query(query, &mut sql),
            SqlStatement::Insert(insert) => generator.write_insert(insert, &mut sql),
            SqlStatement::Update(update) => generator.write_update(update, &mut sql),
            SqlStatement::Delete(delete) => generator.write_delete(delete, &mut sql),
        }
        sql
    }
}

impl ToSql for SqlExp {
    fn to_sql_with(&self, generator: &SqlGenerator) -> String {
        let mut sql = String::new();
        generator.write_exp(self, &mut sql);
        sql
    }
}
