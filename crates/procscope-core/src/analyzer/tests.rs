//! End-to-end analyzer tests: seed scenarios and cross-cutting properties.

use super::analyze;
use crate::types::*;

fn run(sql: &str) -> AnalyzeResult {
    analyze(&AnalyzeRequest {
        sql: sql.to_string(),
        schema: None,
    })
}

fn run_with_schema(sql: &str, tables: &[(&str, &[&str])]) -> AnalyzeResult {
    let schema = SchemaMetadata {
        tables: tables
            .iter()
            .map(|(name, columns)| SchemaTable {
                name: name.to_string(),
                columns: columns
                    .iter()
                    .map(|c| ColumnSchema {
                        name: c.to_string(),
                        data_type: None,
                    })
                    .collect(),
            })
            .collect(),
    };
    analyze(&AnalyzeRequest {
        sql: sql.to_string(),
        schema: Some(schema),
    })
}

/// Lineages as `source_table.source_column -> target_table.target_column`.
fn lineage_strings(result: &AnalyzeResult) -> Vec<String> {
    result
        .analysis
        .column_lineages
        .iter()
        .map(|l| {
            format!(
                "{}.{} -> {}.{}",
                l.source_table, l.source_column, l.target_table, l.target_column
            )
        })
        .collect()
}

fn has_issue(result: &AnalyzeResult, code: &str) -> bool {
    result.issues.iter().any(|i| i.code == code)
}

#[test]
fn test_temp_table_pipeline() {
    // Seed scenario S1.
    let sql = r#"
        CREATE TABLE #t (id int, name nvarchar(50));
        INSERT INTO #t(id, name) SELECT c.cid, c.cname FROM dbo.Customer c;
        INSERT INTO dbo.Report(rid, rname) SELECT id, name FROM #t;
    "#;
    let result = run(sql);

    assert_eq!(result.analysis.source_tables, ["dbo.customer"]);
    assert_eq!(result.analysis.target_tables, ["dbo.report"]);
    assert_eq!(
        lineage_strings(&result),
        [
            "dbo.customer.cid -> dbo.report.rid",
            "dbo.customer.cname -> dbo.report.rname",
        ]
    );

    let temp = &result.analysis.temp_table_patterns;
    assert_eq!(temp.len(), 1);
    assert_eq!(temp[0].name, "#t");
    assert_eq!(temp[0].source_pattern, "CREATE TABLE");
    assert_eq!(temp[0].columns, ["id", "name"]);
    assert!(temp[0].is_intermediate);
}

#[test]
fn test_cte_chain() {
    // Seed scenario S2.
    let sql = r#"
        WITH a AS (SELECT x AS u FROM dbo.S), b AS (SELECT u AS v FROM a)
        INSERT INTO dbo.T(w) SELECT v FROM b;
    "#;
    let result = run(sql);

    assert_eq!(lineage_strings(&result), ["dbo.s.x -> dbo.t.w"]);
    assert_eq!(result.analysis.source_tables, ["dbo.s"]);
    assert_eq!(result.analysis.target_tables, ["dbo.t"]);
}

#[test]
fn test_merge_with_derived_source() {
    // Seed scenario S3.
    let sql = r#"
        MERGE dbo.Tgt AS T USING (SELECT k, v FROM dbo.Src) AS S ON T.k = S.k
        WHEN MATCHED THEN UPDATE SET T.v = S.v
        WHEN NOT MATCHED THEN INSERT(k, v) VALUES(S.k, S.v);
    "#;
    let result = run(sql);

    assert_eq!(
        lineage_strings(&result),
        ["dbo.src.k -> dbo.tgt.k", "dbo.src.v -> dbo.tgt.v"]
    );
    assert_eq!(result.analysis.target_tables, ["dbo.tgt"]);

    let merges = &result.analysis.merge_patterns;
    assert_eq!(merges.len(), 1);
    assert_eq!(merges[0].source_table, "s");
    assert_eq!(merges[0].target_table, "dbo.tgt");
    assert_eq!(merges[0].join_columns, ["k"]);
    assert_eq!(merges[0].update_columns, ["v"]);
    assert_eq!(merges[0].insert_columns, ["k", "v"]);
}

#[test]
fn test_merge_with_named_source() {
    let sql = r#"
        MERGE dbo.Tgt AS T USING dbo.Src AS S ON T.k = S.k
        WHEN MATCHED THEN UPDATE SET T.v = S.v;
    "#;
    let result = run(sql);

    assert_eq!(lineage_strings(&result), ["dbo.src.v -> dbo.tgt.v"]);
    assert_eq!(result.analysis.merge_patterns[0].source_table, "dbo.src");
}

#[test]
fn test_select_star_with_known_schema() {
    // Seed scenario S4.
    let sql = "INSERT INTO dbo.Dst(a, b) SELECT * FROM dbo.Src;";
    let result = run_with_schema(sql, &[("dbo.src", &["a", "b"])]);

    assert_eq!(
        lineage_strings(&result),
        ["dbo.src.a -> dbo.dst.a", "dbo.src.b -> dbo.dst.b"]
    );
}

#[test]
fn test_select_star_without_schema_is_dropped() {
    let sql = "INSERT INTO dbo.Dst(a, b) SELECT * FROM dbo.Src;";
    let result = run(sql);

    assert!(result.analysis.column_lineages.is_empty());
    assert!(has_issue(&result, issue_codes::AMBIGUOUS_EXPANSION));
    // Target is still a modified table even without column lineage.
    assert_eq!(result.analysis.target_tables, ["dbo.dst"]);
}

#[test]
fn test_star_expansion_equivalent_to_explicit_list() {
    let star = "INSERT INTO dbo.Dst(a, b) SELECT * FROM dbo.Src;";
    let explicit = "INSERT INTO dbo.Dst(a, b) SELECT a, b FROM dbo.Src;";
    let schema: &[(&str, &[&str])] = &[("dbo.src", &["a", "b"])];

    let star_result = run_with_schema(star, schema);
    let explicit_result = run_with_schema(explicit, schema);
    assert_eq!(
        star_result.analysis.column_lineages,
        explicit_result.analysis.column_lineages
    );
}

#[test]
fn test_recursive_cte_terminates() {
    // Seed scenario S5: the recursive reference resolves to the CTE itself
    // and contributes nothing beyond the base case.
    let sql = r#"
        WITH r AS (SELECT id FROM dbo.Seed UNION ALL SELECT id FROM r)
        INSERT INTO dbo.Out(id) SELECT id FROM r;
    "#;
    let result = run(sql);

    assert_eq!(lineage_strings(&result), ["dbo.seed.id -> dbo.out.id"]);
}

#[test]
fn test_function_and_isnull_sources() {
    // Seed scenario S6.
    let sql = r#"
        INSERT INTO dbo.Tgt(msg)
        SELECT ISNULL(c.descr, c.deflt) FROM dbo.A a JOIN dbo.C c ON a.k = c.k;
    "#;
    let result = run(sql);

    assert_eq!(
        lineage_strings(&result),
        ["dbo.c.deflt -> dbo.tgt.msg", "dbo.c.descr -> dbo.tgt.msg"]
    );
    assert_eq!(result.analysis.source_tables, ["dbo.c"]);
}

#[test]
fn test_extra_select_columns_are_dropped() {
    let sql = "INSERT INTO dbo.T(a) SELECT x, y FROM dbo.S;";
    let result = run(sql);

    assert_eq!(lineage_strings(&result), ["dbo.s.x -> dbo.t.a"]);
    assert!(has_issue(&result, issue_codes::COLUMN_COUNT_MISMATCH));
}

#[test]
fn test_missing_select_columns_leave_targets_unmapped() {
    let sql = "INSERT INTO dbo.T(a, b) SELECT x FROM dbo.S;";
    let result = run(sql);

    assert_eq!(lineage_strings(&result), ["dbo.s.x -> dbo.t.a"]);
    assert!(has_issue(&result, issue_codes::COLUMN_COUNT_MISMATCH));
}

#[test]
fn test_alias_equivalence_for_output_names() {
    // `SELECT col AS x` into column x is equivalent to positional `SELECT col`.
    let aliased = "INSERT INTO dbo.T(x) SELECT col AS x FROM dbo.S;";
    let positional = "INSERT INTO dbo.T(x) SELECT col FROM dbo.S;";
    assert_eq!(
        run(aliased).analysis.column_lineages,
        run(positional).analysis.column_lineages
    );
}

#[test]
fn test_select_into_temp_table() {
    let sql = r#"
        SELECT c.cid AS id INTO #x FROM dbo.Customer c;
        INSERT INTO dbo.Out(id) SELECT id FROM #x;
    "#;
    let result = run(sql);

    assert_eq!(lineage_strings(&result), ["dbo.customer.cid -> dbo.out.id"]);
    let temp = &result.analysis.temp_table_patterns;
    assert_eq!(temp.len(), 1);
    assert_eq!(temp[0].name, "#x");
    assert_eq!(temp[0].source_pattern, "SELECT INTO");
    assert_eq!(temp[0].columns, ["id"]);
    assert!(temp[0].is_intermediate);
}

#[test]
fn test_select_into_permanent_table() {
    let sql = "SELECT c.cid AS id INTO dbo.Snapshot FROM dbo.Customer c;";
    let result = run(sql);

    assert_eq!(
        lineage_strings(&result),
        ["dbo.customer.cid -> dbo.snapshot.id"]
    );
    assert_eq!(result.analysis.target_tables, ["dbo.snapshot"]);
}

#[test]
fn test_update_with_from_clause() {
    let sql = "UPDATE dbo.T SET v = s.v FROM dbo.S s WHERE dbo.T.k = s.k;";
    let result = run(sql);

    assert_eq!(lineage_strings(&result), ["dbo.s.v -> dbo.t.v"]);
    assert_eq!(result.analysis.target_tables, ["dbo.t"]);
}

#[test]
fn test_update_alias_form() {
    // T-SQL: the UPDATE target is an alias bound in the FROM clause.
    let sql = "UPDATE t SET t.v = s.v FROM dbo.Tgt t JOIN dbo.Src s ON t.k = s.k;";
    let result = run(sql);

    assert_eq!(lineage_strings(&result), ["dbo.src.v -> dbo.tgt.v"]);
    assert_eq!(result.analysis.target_tables, ["dbo.tgt"]);
}

#[test]
fn test_insert_values_literals_produce_no_fragments() {
    let sql = "INSERT INTO dbo.T(a, b) VALUES (1, 'x');";
    let result = run(sql);

    assert!(result.analysis.column_lineages.is_empty());
    assert_eq!(result.analysis.target_tables, ["dbo.t"]);
    assert!(!result.summary.has_errors);
}

#[test]
fn test_insert_without_column_list_uses_registry() {
    let sql = "INSERT INTO dbo.Dst SELECT a, b FROM dbo.Src;";
    let result = run_with_schema(sql, &[("dbo.dst", &["p", "q"])]);

    assert_eq!(
        lineage_strings(&result),
        ["dbo.src.a -> dbo.dst.p", "dbo.src.b -> dbo.dst.q"]
    );
}

#[test]
fn test_insert_without_column_list_infers_from_select() {
    let sql = "INSERT INTO dbo.Dst SELECT a, b FROM dbo.Src;";
    let result = run(sql);

    assert_eq!(
        lineage_strings(&result),
        ["dbo.src.a -> dbo.dst.a", "dbo.src.b -> dbo.dst.b"]
    );
    assert!(has_issue(&result, issue_codes::UNKNOWN_SCHEMA));
}

#[test]
fn test_procedure_name_and_go_batches() {
    let sql = r#"
        CREATE PROCEDURE [dbo].[usp_LoadReport]
            @BatchDate datetime
        AS
        BEGIN
            CREATE TABLE #stage (id int);
            INSERT INTO #stage(id) SELECT c.cid FROM dbo.Customer c;
            INSERT INTO dbo.Report(rid) SELECT id FROM #stage;
        END
    "#;
    let result = run(sql);

    assert_eq!(result.analysis.procedure_name, "dbo.usp_loadreport");
    assert_eq!(lineage_strings(&result), ["dbo.customer.cid -> dbo.report.rid"]);
}

#[test]
fn test_multi_batch_script() {
    let sql = "INSERT INTO #w(x) SELECT a FROM dbo.S;\nGO\nINSERT INTO dbo.T(x) SELECT x FROM #w;";
    let result = run_with_schema(sql, &[]);

    // #w has no declared schema; the explicit column lists still pair.
    assert_eq!(lineage_strings(&result), ["dbo.s.a -> dbo.t.x"]);
}

#[test]
fn test_dead_temp_write_changes_nothing() {
    let base = r#"
        INSERT INTO dbo.T(x) SELECT a FROM dbo.S;
    "#;
    let with_dead_temp = r#"
        INSERT INTO dbo.T(x) SELECT a FROM dbo.S;
        CREATE TABLE #dead (y int);
        INSERT INTO #dead(y) SELECT b FROM dbo.S;
    "#;

    let base_result = run(base);
    let dead_result = run(with_dead_temp);

    assert_eq!(
        base_result.analysis.column_lineages,
        dead_result.analysis.column_lineages
    );
    assert_eq!(
        base_result.analysis.target_tables,
        dead_result.analysis.target_tables
    );

    let temp = &dead_result.analysis.temp_table_patterns;
    assert_eq!(temp.len(), 1);
    assert!(!temp[0].is_intermediate, "never-read temp is not intermediate");
}

#[test]
fn test_alias_rename_invariance() {
    let original = "INSERT INTO dbo.T(x) SELECT c.a FROM dbo.S c JOIN dbo.R d ON c.k = d.k;";
    let renamed = "INSERT INTO dbo.T(x) SELECT src.a FROM dbo.S src JOIN dbo.R o ON src.k = o.k;";
    assert_eq!(run(original).analysis, run(renamed).analysis);
}

#[test]
fn test_idempotence() {
    let sql = r#"
        CREATE TABLE #t (id int);
        INSERT INTO #t(id) SELECT cid FROM dbo.Customer;
        MERGE dbo.Tgt AS T USING #t AS S ON T.id = S.id
        WHEN MATCHED THEN UPDATE SET T.id = S.id;
    "#;
    let first = run(sql);
    let second = run(sql);

    assert_eq!(first.analysis, second.analysis);
    assert_eq!(
        serde_json::to_string(&first.analysis).unwrap(),
        serde_json::to_string(&second.analysis).unwrap()
    );
}

#[test]
fn test_cte_sibling_order_independence() {
    let ab = r#"
        WITH a AS (SELECT x FROM dbo.S1), b AS (SELECT y FROM dbo.S2)
        INSERT INTO dbo.T(p, q) SELECT a.x, b.y FROM a JOIN b ON a.x = b.y;
    "#;
    let ba = r#"
        WITH b AS (SELECT y FROM dbo.S2), a AS (SELECT x FROM dbo.S1)
        INSERT INTO dbo.T(p, q) SELECT a.x, b.y FROM a JOIN b ON a.x = b.y;
    "#;
    assert_eq!(
        run(ab).analysis.column_lineages,
        run(ba).analysis.column_lineages
    );
}

#[test]
fn test_resolved_lineage_endpoints_are_permanent() {
    // Universal invariant 1: no temp or CTE name survives resolution.
    let sql = r#"
        CREATE TABLE #m (v int);
        WITH c AS (SELECT v FROM dbo.In1)
        INSERT INTO #m(v) SELECT v FROM c;
        INSERT INTO dbo.Out1(v) SELECT v FROM #m;
    "#;
    let result = run(sql);

    assert!(!result.analysis.column_lineages.is_empty());
    for lineage in &result.analysis.column_lineages {
        assert!(!lineage.source_table.starts_with('#'));
        assert!(!lineage.target_table.starts_with('#'));
        assert!(lineage.source_table.contains('.'), "CTE leaked: {lineage:?}");
        assert!(lineage.target_table.contains('.'), "CTE leaked: {lineage:?}");
    }
}

#[test]
fn test_unresolved_alias_drops_out() {
    let sql = "INSERT INTO dbo.T(x) SELECT z.col FROM dbo.S s;";
    let result = run(sql);

    assert!(result.analysis.column_lineages.is_empty());
    assert!(has_issue(&result, issue_codes::UNRESOLVED_REFERENCE));
}

#[test]
fn test_ambiguous_unqualified_column_is_dropped() {
    let sql = "INSERT INTO dbo.T(x) SELECT k FROM dbo.A a JOIN dbo.B b ON a.j = b.j;";
    let result = run(sql);

    assert!(result.analysis.column_lineages.is_empty());
    assert!(has_issue(&result, issue_codes::UNRESOLVED_REFERENCE));
}

#[test]
fn test_unqualified_column_resolved_through_schema() {
    let sql = "INSERT INTO dbo.T(x) SELECT k FROM dbo.A a JOIN dbo.B b ON a.j = b.j;";
    let result = run_with_schema(sql, &[("dbo.a", &["j", "k"]), ("dbo.b", &["j"])]);

    assert_eq!(lineage_strings(&result), ["dbo.a.k -> dbo.t.x"]);
}

#[test]
fn test_parse_error_sets_has_errors_and_salvages() {
    let sql = "SELECT a FROM dbo.S; FROB NOZZLE; INSERT INTO dbo.T(x) SELECT a FROM dbo.S;";
    let result = run(sql);

    assert!(result.summary.has_errors);
    assert!(has_issue(&result, issue_codes::PARSE_ERROR));
    assert_eq!(lineage_strings(&result), ["dbo.s.a -> dbo.t.x"]);
}

#[test]
fn test_empty_input_is_invalid_request() {
    let result = run("   ");
    assert!(result.summary.has_errors);
    assert!(has_issue(&result, issue_codes::INVALID_REQUEST));
}

#[test]
fn test_case_expression_collects_all_branches() {
    let sql = r#"
        INSERT INTO dbo.T(x)
        SELECT CASE WHEN s.flag = 1 THEN s.a ELSE s.b END FROM dbo.S s;
    "#;
    let result = run(sql);

    let lineages = lineage_strings(&result);
    assert!(lineages.contains(&"dbo.s.a -> dbo.t.x".to_string()));
    assert!(lineages.contains(&"dbo.s.b -> dbo.t.x".to_string()));
    assert!(lineages.contains(&"dbo.s.flag -> dbo.t.x".to_string()));
}

#[test]
fn test_cast_and_nested_functions() {
    let sql = r#"
        INSERT INTO dbo.T(x)
        SELECT CAST(UPPER(s.name) AS nvarchar(10)) FROM dbo.S s;
    "#;
    let result = run(sql);

    assert_eq!(lineage_strings(&result), ["dbo.s.name -> dbo.t.x"]);
}

#[test]
fn test_derived_table_in_from() {
    let sql = r#"
        INSERT INTO dbo.T(x)
        SELECT d.a FROM (SELECT s.a FROM dbo.S s) d;
    "#;
    let result = run(sql);

    assert_eq!(lineage_strings(&result), ["dbo.s.a -> dbo.t.x"]);
}

#[test]
fn test_delete_records_output_table() {
    let sql = "DELETE FROM dbo.Stale WHERE id = 1;";
    let result = run(sql);

    assert_eq!(result.analysis.target_tables, ["dbo.stale"]);
    assert!(result.analysis.column_lineages.is_empty());
}

#[test]
fn test_table_both_input_and_output() {
    let sql = r#"
        INSERT INTO dbo.T(x) SELECT a FROM dbo.S;
        INSERT INTO dbo.S(a) SELECT x FROM dbo.T;
    "#;
    let result = run(sql);

    assert_eq!(result.analysis.source_tables, ["dbo.s", "dbo.t"]);
    assert_eq!(result.analysis.target_tables, ["dbo.s", "dbo.t"]);
}

#[test]
fn test_report_ordering_is_deterministic() {
    let sql = r#"
        INSERT INTO dbo.B(y) SELECT q FROM dbo.Z;
        INSERT INTO dbo.A(x) SELECT p FROM dbo.Y;
    "#;
    let result = run(sql);

    assert_eq!(result.analysis.target_tables, ["dbo.a", "dbo.b"]);
    let lineages = lineage_strings(&result);
    assert_eq!(
        lineages,
        ["dbo.y.p -> dbo.a.x", "dbo.z.q -> dbo.b.y"],
        "sorted by (target_table, target_column, source_table, source_column)"
    );
}

#[test]
fn test_summary_counts() {
    let sql = r#"
        CREATE TABLE #t (id int);
        INSERT INTO #t(id) SELECT cid FROM dbo.Customer;
        INSERT INTO dbo.Report(rid) SELECT id FROM #t;
    "#;
    let result = run(sql);

    assert_eq!(result.summary.statement_count, 3);
    assert_eq!(result.summary.fragment_count, 2);
    assert_eq!(result.summary.lineage_count, 1);
    assert!(!result.summary.has_errors);
}
