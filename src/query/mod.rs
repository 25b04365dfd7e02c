//! Query wire types and the query compiler.

pub mod compile;
pub mod form;

pub use compile::{
    compile_query, compile_scope, Comparison, Condition, FilterOp, Search, Selection, Sort,
};
pub use form::{clamp_page, Filter, Order, QueryForm, QueryResult, DEFAULT_QUERY_LIMIT};
