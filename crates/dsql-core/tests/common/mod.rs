#![allow(dead_code)]

use dsql_core::{Params, Query};

pub fn render(query: &Query) -> (String, Params) {
    query
        .render()
        .unwrap_or_else(|e| panic!("Failed to render: {e:?}"))
}

pub fn sql_of(query: &Query) -> String {
    render(query).0
}

pub fn param_names(params: &Params) -> Vec<String> {
    params.keys().cloned().collect()
}
