//! PostgREST 查询构建
//!
//! 只覆盖本应用用到的过滤与排序语法。

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

/// 表查询，按添加顺序拼接 query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    table: String,
    params: Vec<(String, String)>,
}

impl TableQuery {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            params: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn select(self, columns: &str) -> Self {
        self.param("select", columns)
    }

    pub fn eq(self, column: &str, value: &str) -> Self {
        self.param(column, &format!("eq.{}", value))
    }

    pub fn order(self, column: &str, order: Order) -> Self {
        self.param("order", &format!("{}.{}", column, order.as_str()))
    }

    pub fn limit(self, n: usize) -> Self {
        self.param("limit", &n.to_string())
    }

    pub fn on_conflict(self, columns: &str) -> Self {
        self.param("on_conflict", columns)
    }

    fn param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// `/rest/v1/<table>?k=v&...`
    pub fn path(&self) -> String {
        let mut path = format!("/rest/v1/{}", self.table);
        for (i, (k, v)) in self.params.iter().enumerate() {
            path.push(if i == 0 { '?' } else { '&' });
            path.push_str(&encode_component(k));
            path.push('=');
            path.push_str(&encode_component(v));
        }
        path
    }
}

/// 百分号编码，保留 PostgREST 语法需要的 `.` `,` `*`
pub fn encode_component(input: &str) -> String {
    urlencoding::encode(input)
        .replace("%2C", ",")
        .replace("%2A", "*")
}
