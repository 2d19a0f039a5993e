use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take_while, take_while1},
    character::complete::{alpha1, char, digit1, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
};
use quarry_core::Value;

/// Operand of a statement, placeholders are replaced by the bound values before execution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Placeholder,
    Literal(Value),
}

impl Expr {
    pub(crate) fn is_placeholder(&self) -> bool {
        matches!(self, Expr::Placeholder)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Condition {
    pub(crate) column: String,
    pub(crate) op: Op,
    pub(crate) value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Projection {
    All,
    Count,
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Order {
    pub(crate) column: String,
    pub(crate) descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnDefinition {
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) primary_key: bool,
    pub(crate) not_null: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Sql {
    CreateTable {
        name: String,
        if_not_exists: bool,
        columns: Vec<ColumnDefinition>,
        primary_key: Option<String>,
    },
    DropTable {
        name: String,
        if_exists: bool,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        rows: Vec<Vec<Expr>>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Expr)>,
        filter: Vec<Condition>,
    },
    Delete {
        table: String,
        filter: Vec<Condition>,
    },
    Select {
        table: String,
        projection: Projection,
        filter: Vec<Condition>,
        order: Vec<Order>,
        offset: u64,
        limit: Option<u64>,
    },
}

impl Sql {
    pub(crate) fn is_write(&self) -> bool {
        !matches!(self, Sql::Select { .. })
    }

    /// Placeholders in the order they appear in the text.
    pub(crate) fn placeholders(&mut self) -> Vec<&mut Expr> {
        let exprs: Vec<&mut Expr> = match self {
            Sql::CreateTable { .. } | Sql::DropTable { .. } => Vec::new(),
            Sql::Insert { rows, .. } => rows.iter_mut().flatten().collect(),
            Sql::Update {
                assignments,
                filter,
                ..
            } => assignments
                .iter_mut()
                .map(|(_, v)| v)
                .chain(filter.iter_mut().map(|v| &mut v.value))
                .collect(),
            Sql::Delete { filter, .. } | Sql::Select { filter, .. } => {
                filter.iter_mut().map(|v| &mut v.value).collect()
            }
        };
        exprs.into_iter().filter(|v| v.is_placeholder()).collect()
    }
}

/// Parses one statement of the supported subset, a trailing semicolon is accepted.
pub(crate) fn parse_sql(input: &str) -> Option<Sql> {
    all_consuming(terminated(
        alt((create_table, drop_table, insert, update, delete, select)),
        opt(ws(char(';'))),
    ))(input)
    .ok()
    .map(|(_, sql)| sql)
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Case insensitive keyword that is not the prefix of a longer word.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    ws(terminated(tag_no_case(word), not(satisfy(is_identifier_char))))
}

/// Plain or quoted identifier, lower cased.
fn identifier(input: &str) -> IResult<&str, String> {
    alt((
        map(
            delimited(char('`'), take_while1(|c: char| c != '`'), char('`')),
            str::to_lowercase,
        ),
        map(
            delimited(char('"'), take_while1(|c: char| c != '"'), char('"')),
            str::to_lowercase,
        ),
        map(
            recognize(pair(alt((alpha1, tag("_"))), take_while(is_identifier_char))),
            str::to_lowercase,
        ),
    ))(input)
}

fn comma(input: &str) -> IResult<&str, char> {
    ws(char(','))(input)
}

fn identifiers(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        ws(char('(')),
        separated_list1(comma, ws(identifier)),
        ws(char(')')),
    )(input)
}

fn unsigned(input: &str) -> IResult<&str, u64> {
    ws(map_res(digit1, |v: &str| v.parse::<u64>()))(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    map(
        delimited(
            char('\''),
            many0(alt((value("'", tag("''")), is_not("'")))),
            char('\''),
        ),
        |parts: Vec<&str>| parts.concat(),
    )(input)
}

fn number(input: &str) -> IResult<&str, Value> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
        ))),
        |v: &str| {
            if v.contains('.') {
                v.parse::<f64>()
                    .map(|v| Value::Float64(Some(v)))
                    .map_err(|e| e.to_string())
            } else {
                v.parse::<i64>()
                    .map(|v| Value::Int64(Some(v)))
                    .map_err(|e| e.to_string())
            }
        },
    )(input)
}

fn expr(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        value(Expr::Placeholder, char('?')),
        value(Expr::Literal(Value::Null), keyword("NULL")),
        value(Expr::Literal(Value::Boolean(Some(true))), keyword("TRUE")),
        value(Expr::Literal(Value::Boolean(Some(false))), keyword("FALSE")),
        map(string_literal, |v| Expr::Literal(Value::Varchar(Some(v)))),
        map(number, Expr::Literal),
    )))(input)
}

fn operator(input: &str) -> IResult<&str, Op> {
    ws(alt((
        value(Op::Le, tag("<=")),
        value(Op::Ge, tag(">=")),
        value(Op::Ne, tag("<>")),
        value(Op::Ne, tag("!=")),
        value(Op::Eq, tag("=")),
        value(Op::Lt, tag("<")),
        value(Op::Gt, tag(">")),
    )))(input)
}

fn condition(input: &str) -> IResult<&str, Condition> {
    let (input, column) = ws(identifier)(input)?;
    let (input, (op, value)) = alt((
        value(
            (Op::IsNotNull, Expr::Literal(Value::Null)),
            tuple((keyword("IS"), keyword("NOT"), keyword("NULL"))),
        ),
        value(
            (Op::IsNull, Expr::Literal(Value::Null)),
            pair(keyword("IS"), keyword("NULL")),
        ),
        pair(operator, expr),
    ))(input)?;
    Ok((input, Condition { column, op, value }))
}

fn filter(input: &str) -> IResult<&str, Vec<Condition>> {
    map(
        opt(preceded(
            keyword("WHERE"),
            separated_list1(keyword("AND"), condition),
        )),
        Option::unwrap_or_default,
    )(input)
}

fn column_definition(input: &str) -> IResult<&str, ColumnDefinition> {
    let (input, name) = ws(identifier)(input)?;
    let (input, type_name) = ws(recognize(pair(
        pair(alpha1, take_while(is_identifier_char)),
        opt(ws(delimited(
            char('('),
            take_while1(|c: char| c != ')'),
            char(')'),
        ))),
    )))(input)?;
    let (input, constraints) = many0(alt((
        value("PRIMARY KEY", pair(keyword("PRIMARY"), keyword("KEY"))),
        value("NOT NULL", pair(keyword("NOT"), keyword("NULL"))),
        value("NULL", keyword("NULL")),
    )))(input)?;
    let primary_key = constraints.contains(&"PRIMARY KEY");
    Ok((
        input,
        ColumnDefinition {
            name,
            type_name: type_name.trim().to_uppercase(),
            primary_key,
            not_null: primary_key || constraints.contains(&"NOT NULL"),
        },
    ))
}

enum TableItem {
    Column(ColumnDefinition),
    PrimaryKey(String),
}

fn create_table(input: &str) -> IResult<&str, Sql> {
    let (input, _) = pair(keyword("CREATE"), keyword("TABLE"))(input)?;
    let (input, if_not_exists) =
        opt(tuple((keyword("IF"), keyword("NOT"), keyword("EXISTS"))))(input)?;
    let (input, name) = ws(identifier)(input)?;
    let (input, items) = delimited(
        ws(char('(')),
        separated_list1(
            comma,
            alt((
                map(
                    preceded(pair(keyword("PRIMARY"), keyword("KEY")), identifiers),
                    |mut v| TableItem::PrimaryKey(v.swap_remove(0)),
                ),
                map(column_definition, TableItem::Column),
            )),
        ),
        ws(char(')')),
    )(input)?;
    let mut columns = Vec::new();
    let mut primary_key = None;
    for item in items {
        match item {
            TableItem::Column(column) => columns.push(column),
            TableItem::PrimaryKey(column) => primary_key = Some(column),
        }
    }
    Ok((
        input,
        Sql::CreateTable {
            name,
            if_not_exists: if_not_exists.is_some(),
            columns,
            primary_key,
        },
    ))
}

fn drop_table(input: &str) -> IResult<&str, Sql> {
    map(
        tuple((
            keyword("DROP"),
            keyword("TABLE"),
            opt(pair(keyword("IF"), keyword("EXISTS"))),
            ws(identifier),
        )),
        |(_, _, if_exists, name)| Sql::DropTable {
            name,
            if_exists: if_exists.is_some(),
        },
    )(input)
}

fn insert(input: &str) -> IResult<&str, Sql> {
    map(
        tuple((
            keyword("INSERT"),
            keyword("INTO"),
            ws(identifier),
            identifiers,
            keyword("VALUES"),
            separated_list1(
                comma,
                delimited(ws(char('(')), separated_list1(comma, expr), ws(char(')'))),
            ),
        )),
        |(_, _, table, columns, _, rows)| Sql::Insert {
            table,
            columns,
            rows,
        },
    )(input)
}

fn update(input: &str) -> IResult<&str, Sql> {
    map(
        tuple((
            keyword("UPDATE"),
            ws(identifier),
            keyword("SET"),
            separated_list1(
                comma,
                pair(ws(identifier), preceded(ws(char('=')), expr)),
            ),
            filter,
        )),
        |(_, table, _, assignments, filter)| Sql::Update {
            table,
            assignments,
            filter,
        },
    )(input)
}

fn delete(input: &str) -> IResult<&str, Sql> {
    map(
        tuple((keyword("DELETE"), keyword("FROM"), ws(identifier), filter)),
        |(_, _, table, filter)| Sql::Delete { table, filter },
    )(input)
}

fn projection(input: &str) -> IResult<&str, Projection> {
    alt((
        value(
            Projection::Count,
            tuple((keyword("COUNT"), ws(char('(')), ws(char('*')), ws(char(')')))),
        ),
        value(Projection::All, ws(char('*'))),
        map(separated_list1(comma, ws(identifier)), Projection::Columns),
    ))(input)
}

fn order(input: &str) -> IResult<&str, Vec<Order>> {
    map(
        opt(preceded(
            pair(keyword("ORDER"), keyword("BY")),
            separated_list1(
                comma,
                pair(
                    ws(identifier),
                    opt(alt((value(false, keyword("ASC")), value(true, keyword("DESC"))))),
                ),
            ),
        )),
        |v| {
            v.unwrap_or_default()
                .into_iter()
                .map(|(column, descending)| Order {
                    column,
                    descending: descending.unwrap_or(false),
                })
                .collect()
        },
    )(input)
}

/// `LIMIT o,n`, `LIMIT n [OFFSET o]` or `OFFSET o ROWS [FETCH NEXT n ROWS ONLY]`, as (offset, limit).
fn page(input: &str) -> IResult<&str, (u64, Option<u64>)> {
    let rows = || alt((keyword("ROWS"), keyword("ROW")));
    alt((
        map(
            tuple((keyword("LIMIT"), unsigned, comma, unsigned)),
            |(_, offset, _, limit)| (offset, Some(limit)),
        ),
        map(
            tuple((
                keyword("LIMIT"),
                unsigned,
                opt(preceded(keyword("OFFSET"), unsigned)),
            )),
            |(_, limit, offset)| (offset.unwrap_or(0), Some(limit)),
        ),
        map(
            tuple((
                keyword("OFFSET"),
                unsigned,
                rows(),
                opt(tuple((
                    keyword("FETCH"),
                    alt((keyword("NEXT"), keyword("FIRST"))),
                    unsigned,
                    rows(),
                    keyword("ONLY"),
                ))),
            )),
            |(_, offset, _, fetch)| (offset, fetch.map(|(_, _, limit, _, _)| limit)),
        ),
    ))(input)
}

fn select(input: &str) -> IResult<&str, Sql> {
    map(
        tuple((
            keyword("SELECT"),
            projection,
            keyword("FROM"),
            ws(identifier),
            filter,
            order,
            opt(page),
        )),
        |(_, projection, _, table, filter, order, page)| {
            let (offset, limit) = page.unwrap_or((0, None));
            Sql::Select {
                table,
                projection,
                filter,
                order,
                offset,
                limit,
            }
        },
    )(input)
}
