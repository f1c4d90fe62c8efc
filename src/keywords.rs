//! Reserved-word table for the identifier naming rule.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// MySQL reserved words that may not be used as bare identifiers.
static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ADD", "ALL", "ALTER", "ANALYZE", "AND", "AS", "ASC", "BEFORE",
        "BETWEEN", "BIGINT", "BINARY", "BLOB", "BOTH", "BY", "CALL",
        "CASCADE", "CASE", "CHANGE", "CHAR", "CHARACTER", "CHECK", "COLLATE",
        "COLUMN", "CONDITION", "CONSTRAINT", "CONTINUE", "CONVERT", "CREATE",
        "CROSS", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP",
        "CURRENT_USER", "CURSOR", "DATABASE", "DATABASES", "DECIMAL",
        "DECLARE", "DEFAULT", "DELAYED", "DELETE", "DESC", "DESCRIBE",
        "DISTINCT", "DIV", "DOUBLE", "DROP", "EACH", "ELSE", "ELSEIF",
        "ENCLOSED", "ESCAPED", "EXISTS", "EXIT", "EXPLAIN", "FALSE", "FETCH",
        "FLOAT", "FOR", "FORCE", "FOREIGN", "FROM", "FULLTEXT", "GENERATED",
        "GRANT", "GROUP", "HAVING", "HIGH_PRIORITY", "IF", "IGNORE", "IN",
        "INDEX", "INFILE", "INNER", "INOUT", "INSERT", "INT", "INTEGER",
        "INTERVAL", "INTO", "IS", "ITERATE", "JOIN", "KEY", "KEYS", "KILL",
        "LEADING", "LEAVE", "LEFT", "LIKE", "LIMIT", "LINES", "LOAD",
        "LOCALTIME", "LOCALTIMESTAMP", "LOCK", "LONG", "LONGBLOB",
        "LONGTEXT", "LOOP", "LOW_PRIORITY", "MATCH", "MEDIUMBLOB",
        "MEDIUMINT", "MEDIUMTEXT", "MOD", "MODIFIES", "NATURAL", "NOT",
        "NULL", "NUMERIC", "ON", "OPTIMIZE", "OPTION", "OPTIONALLY", "OR",
        "ORDER", "OUT", "OUTER", "OUTFILE", "PARTITION", "PRECISION",
        "PRIMARY", "PROCEDURE", "PURGE", "RANGE", "READ", "READS", "REAL",
        "REFERENCES", "REGEXP", "RELEASE", "RENAME", "REPEAT", "REPLACE",
        "REQUIRE", "RESIGNAL", "RESTRICT", "RETURN", "REVOKE", "RIGHT",
        "RLIKE", "SCHEMA", "SCHEMAS", "SELECT", "SENSITIVE", "SEPARATOR",
        "SET", "SHOW", "SIGNAL", "SMALLINT", "SPATIAL", "SQL", "SQLSTATE",
        "SQLWARNING", "SSL", "STARTING", "STORED", "TABLE", "TERMINATED",
        "THEN", "TINYBLOB", "TINYINT", "TINYTEXT", "TO", "TRAILING",
        "TRIGGER", "TRUE", "UNION", "UNIQUE", "UNLOCK", "UNSIGNED", "UPDATE",
        "USAGE", "USE", "USING", "VALUES", "VARBINARY", "VARCHAR",
        "VARCHARACTER", "VARYING", "VIRTUAL", "WHEN", "WHERE", "WHILE",
        "WITH", "WRITE", "XOR", "ZEROFILL",
    ]
    .into_iter()
    .collect()
});

/// True if `ident` collides with a reserved word (case-insensitive).
pub fn is_reserved(ident: &str) -> bool {
    RESERVED.contains(ident.to_uppercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_lookup_is_case_insensitive() {
        assert!(is_reserved("select"));
        assert!(is_reserved("SELECT"));
        assert!(is_reserved("Table"));
        assert!(!is_reserved("user_id"));
    }
}
