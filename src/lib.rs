//! # Reelstore
//!
//! A typed movie-catalog storage layer on DynamoDB, with S3 poster uploads.
//!
//! The crate is split into a generic table layer and a thin domain layer on
//! top of it:
//! - [`table`] — a [`DynamoTable`] trait with typed partition/sort keys, plus
//!   query, scan, update, batch, and streaming operations; [`GlobalIndex`]
//!   gives a table any number of typed global secondary indexes.
//! - [`setup`] — table lifecycle: create (with GSIs), exists, delete, and
//!   wait-until-active / wait-until-deleted polling.
//! - [`catalog`] — the movie and cinema models and one function per catalog
//!   operation (insert, index lookups, filtered scans, nested detail updates,
//!   batch deletes by genre, and so on).
//! - [`media`] — fetch a file over HTTP and upload it to S3.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reelstore::catalog::{Movie, MovieDetails, movies};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reelstore::Error> {
//!     // Initialize the global clients
//!     let config = aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await;
//!     reelstore::init(&config).await;
//!
//!     let movie = Movie::new(
//!         "uuid-1",
//!         "Inception",
//!         2010,
//!         "Sci-Fi",
//!         8.8,
//!         MovieDetails::new("Christopher Nolan", 148),
//!     );
//!     movies::add_movie(&movie).await?;
//!
//!     let found = movies::fetch_movie("uuid-1", 2010).await?;
//!     println!("{found:?}");
//!
//!     let sci_fi = movies::movies_by_genre("Sci-Fi").await?;
//!     println!("{} sci-fi movies", sci_fi.len());
//!
//!     Ok(())
//! }
//! ```
#![deny(
    warnings,
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
    deprecated,
    unknown_lints,
    unreachable_code,
    unused_mut
)]

mod error;
pub use error::Error;

/// Generic table module
pub mod table;

/// Movie catalog domain module
pub mod catalog;

/// Poster uploads to object storage
pub mod media;

/// Table lifecycle utilities
pub mod setup;

// Re-export main types for convenience
pub use table::{CompositeKey, DynamoTable, GlobalIndex, KeyScalar};

// Re-export aws-config types for configuration
pub use aws_config::{
    BehaviorVersion, Region, SdkConfig, defaults,
    meta::region::{ProvideRegion, RegionProviderChain},
    retry::{RetryConfig, RetryMode},
    timeout::TimeoutConfig,
};

// Re-export aws-types for advanced configuration
pub use aws_types::sdk_config::Builder as SdkConfigBuilder;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;
use tokio::sync::OnceCell;

/// Global DynamoDB client instance
static GLOBAL_CLIENT: OnceCell<DynamoDbClient> = OnceCell::const_new();

/// Global S3 client instance
static GLOBAL_S3_CLIENT: OnceCell<S3Client> = OnceCell::const_new();

/// Shared default AWS config used when a client auto-initializes:
/// - Adaptive retry mode with 3 max attempts
/// - Exponential backoff starting at 1 second
/// - Connect timeout: 3 seconds
/// - Read timeout: 20 seconds
/// - Operation timeout: 60 seconds
/// - LocalStack support via AWS_PROFILE=localstack
async fn aws_config_defaults() -> SdkConfig {
    use aws_config::BehaviorVersion;
    use aws_types::sdk_config::{RetryConfig, TimeoutConfig};
    use std::time::Duration;

    let timeout_config = TimeoutConfig::builder()
        .connect_timeout(Duration::from_secs(3))
        .read_timeout(Duration::from_secs(20))
        .operation_timeout(Duration::from_secs(60))
        .build();

    let mut loader = defaults(BehaviorVersion::latest())
        .retry_config(
            RetryConfig::adaptive()
                .with_max_attempts(3)
                .with_initial_backoff(Duration::from_secs(1)),
        )
        .timeout_config(timeout_config);

    // Support LocalStack via AWS_PROFILE=localstack
    if running_against_localstack() {
        loader = loader.endpoint_url("http://127.0.0.1:4566");
    }

    loader.load().await
}

fn running_against_localstack() -> bool {
    std::env::var("AWS_PROFILE").unwrap_or_default() == "localstack"
}

/// Initialize the global DynamoDB and S3 clients with a custom AWS config
///
/// Use this when you need custom AWS configuration beyond the defaults.
///
/// # Example
///
/// ```rust,no_run
/// #[tokio::main]
/// async fn main() {
///     let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
///         .region(aws_config::Region::new("us-west-2"))
///         .load()
///         .await;
///     reelstore::init(&config).await;
///
///     // Now you can use catalog and media operations
/// }
/// ```
pub async fn init(config: &SdkConfig) {
    let _ = GLOBAL_CLIENT
        .get_or_init(|| async { DynamoDbClient::new(config) })
        .await;
    let _ = GLOBAL_S3_CLIENT
        .get_or_init(|| async { S3Client::new(config) })
        .await;
}

/// Initialize the global DynamoDB client with a custom client instance
///
/// Useful for testing or when you need fine-grained control over client
/// configuration.
pub async fn init_with_client(client: DynamoDbClient) {
    let _ = GLOBAL_CLIENT.get_or_init(|| async { client }).await;
}

/// Initialize the global S3 client with a custom client instance
pub async fn init_with_s3_client(client: S3Client) {
    let _ = GLOBAL_S3_CLIENT.get_or_init(|| async { client }).await;
}

/// Get a reference to the global DynamoDB client
///
/// Automatically initializes the client with sensible defaults if not already
/// initialized. For custom configuration, call [`init`] or
/// [`init_with_client`] before using this function.
pub async fn dynamodb_client() -> &'static DynamoDbClient {
    GLOBAL_CLIENT
        .get_or_init(|| async {
            let config = aws_config_defaults().await;
            DynamoDbClient::new(&config)
        })
        .await
}

/// Get a reference to the global S3 client
///
/// Automatically initializes the client with the same defaults as
/// [`dynamodb_client`]; against LocalStack the client is switched to
/// path-style addressing, since virtual-host bucket URLs do not resolve
/// there.
pub async fn s3_client() -> &'static S3Client {
    GLOBAL_S3_CLIENT
        .get_or_init(|| async {
            let config = aws_config_defaults().await;
            let mut builder = aws_sdk_s3::config::Builder::from(&config);
            if running_against_localstack() {
                builder = builder.force_path_style(true);
            }
            S3Client::from_conf(builder.build())
        })
        .await
}

#[allow(unused_variables)]
pub(crate) fn assert_not_reserved_key(key: &str) {
    // https://docs.aws.amazon.com/amazondynamodb/latest/developerguide/ReservedWords.html
    #[cfg(debug_assertions)]
    {
        #[rustfmt::skip]
        const KEYS: [&str; 573] = [
"abort", "absolute", "action", "add", "after", "agent", "aggregate", "all", "allocate", "alter", "analyze", "and", "any", "archive", "are", "array", "as", "asc", "ascii", "asensitive", "assertion", "asymmetric", "at", "atomic", "attach", "attribute", "auth", "authorization", "authorize", "auto", "avg", "back", "backup", "base", "batch", "before", "begin", "between", "bigint", "binary", "bit", "blob", "block", "boolean", "both", "breadth", "bucket", "bulk", "by", "byte", "call", "called", "calling", "capacity", "cascade", "cascaded", "case", "cast", "catalog", "char", "character", "check", "class", "clob", "close", "cluster", "clustered", "clustering", "clusters", "coalesce", "collate", "collation", "collection", "column", "columns", "combine", "comment", "commit", "compact", "compile", "compress", "condition", "conflict", "connect", "connection", "consistency", "consistent", "constraint", "constraints", "constructor", "consumed", "continue", "convert", "copy", "corresponding", "count", "counter", "create", "cross", "cube", "current", "cursor", "cycle", "data", "database", "date", "datetime", "day", "deallocate", "dec", "decimal", "declare", "default", "deferrable", "deferred", "define", "defined", "definition", "delete", "delimited", "depth", "deref", "desc", "describe", "descriptor", "detach", "deterministic", "diagnostics", "directories", "disable", "disconnect", "distinct", "distribute", "do", "domain", "double", "drop", "dump", "duration", "dynamic", "each", "element", "else", "elseif", "empty", "enable", "end", "equal", "equals", "error", "escape", "escaped", "eval", "evaluate", "exceeded", "except", "exception", "exceptions", "exclusive", "exec", "execute", "exists", "exit", "explain", "explode", "export", "expression", "extended", "external", "extract", "fail", "false", "family", "fetch", "fields", "file", "filter", "filtering", "final", "finish", "first", "fixed", "flattern", "float", "for", "force", "foreign", "format", "forward", "found", "free", "from", "full", "function", "functions", "general", "generate", "get", "glob", "global", "go", "goto", "grant", "greater", "group", "grouping", "handler", "hash", "have", "having", "heap", "hidden", "hold", "hour", "identified", "identity", "if", "ignore", "immediate", "import", "in", "including", "inclusive", "increment", "incremental", "index", "indexed", "indexes", "indicator", "infinite", "initially", "inline", "inner", "innter", "inout", "input", "insensitive", "insert", "instead", "int", "integer", "intersect", "interval", "into", "invalidate", "is", "isolation", "item", "items", "iterate", "join", "key", "keys", "lag", "language", "large", "last", "lateral", "lead", "leading", "leave", "left", "length", "less", "level", "like", "limit", "limited", "lines", "list", "load", "local", "localtime", "localtimestamp", "location", "locator", "lock", "locks", "log", "loged", "long", "loop", "lower", "map", "match", "materialized", "max", "maxlen", "member", "merge", "method", "metrics", "min", "minus", "minute", "missing", "mod", "mode", "modifies", "modify", "module", "month", "multi", "multiset", "name", "names", "national", "natural", "nchar", "nclob", "new", "next", "no", "none", "not", "null", "nullif", "number", "numeric", "object", "of", "offline", "offset", "old", "on", "online", "only", "opaque", "open", "operator", "option", "or", "order", "ordinality", "other", "others", "out", "outer", "output", "over", "overlaps", "override", "owner", "pad", "parallel", "parameter", "parameters", "partial", "partition", "partitioned", "partitions", "path", "percent", "percentile", "permission", "permissions", "pipe", "pipelined", "plan", "pool", "position", "precision", "prepare", "preserve", "primary", "prior", "private", "privileges", "procedure", "processed", "project", "projection", "property", "provisioning", "public", "put", "query", "quit", "quorum", "raise", "random", "range", "rank", "raw", "read", "reads", "real", "rebuild", "record", "recursive", "reduce", "ref", "reference", "references", "referencing", "regexp", "region", "reindex", "relative", "release", "remainder", "rename", "repeat", "replace", "request", "reset", "resignal", "resource", "response", "restore", "restrict", "result", "return", "returning", "returns", "reverse", "revoke", "right", "role", "roles", "rollback", "rollup", "routine", "row", "rows", "rule", "rules", "sample", "satisfies", "save", "savepoint", "scan", "schema", "scope", "scroll", "search", "second", "section", "segment", "segments", "select", "self", "semi", "sensitive", "separate", "sequence", "serializable", "session", "set", "sets", "shard", "share", "shared", "short", "show", "signal", "similar", "size", "skewed", "smallint", "snapshot", "some", "source", "space", "spaces", "sparse", "specific", "specifictype", "split", "sql", "sqlcode", "sqlerror", "sqlexception", "sqlstate", "sqlwarning", "start", "state", "static", "status", "storage", "store", "stored", "stream", "string", "struct", "style", "sub", "submultiset", "subpartition", "substring", "subtype", "sum", "super", "symmetric", "synonym", "system", "table", "tablesample", "temp", "temporary", "terminated", "text", "than", "then", "throughput", "time", "timestamp", "timezone", "tinyint", "to", "token", "total", "touch", "trailing", "transaction", "transform", "translate", "translation", "treat", "trigger", "trim", "true", "truncate", "ttl", "tuple", "type", "under", "undo", "union", "unique", "unit", "unknown", "unlogged", "unnest", "unprocessed", "unsigned", "until", "update", "upper", "url", "usage", "use", "user", "users", "using", "uuid", "vacuum", "value", "valued", "values", "varchar", "variable", "variance", "varint", "varying", "view", "views", "virtual", "void", "wait", "when", "whenever", "where", "while", "window", "with", "within", "without", "work", "wrapped", "write", "year", "zone "
];

        debug_assert!(!KEYS.contains(&key), "Reserved key: {key}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CompositeKey;

    #[test]
    fn test_composite_key_tuple() {
        let key: CompositeKey<String, u16> = ("uuid-1".to_string(), Some(2010));
        assert_eq!(key.0, "uuid-1");
        assert_eq!(key.1, Some(2010));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "Reserved key: duration")]
    fn test_assert_reserved_key_panics() {
        assert_not_reserved_key("duration");
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_assert_not_reserved_key_ok() {
        assert_not_reserved_key("movie_id");
        assert_not_reserved_key("release_year");
        assert_not_reserved_key("runtime_minutes");
    }
}
