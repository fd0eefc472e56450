mod common;

use common::{in_memory_analyzer, java_with_call_at, Monolith};
use impactmap::{
    CallChain, CancellationToken, ImpactAnalyzer, ImpactError, ImpactmapConfig, IndexStatistics,
};
use indoc::indoc;
use pretty_assertions::assert_eq;

#[test]
fn test_orders_end_to_end() {
    let monolith = Monolith::new().with_orders();
    let (analyzer, _sink) = in_memory_analyzer();
    analyzer.initialize(monolith.root()).unwrap();

    let result = analyzer.analyze_table_impact("orders").unwrap();

    assert_eq!(result.table_name, "ORDERS");
    assert_eq!(
        result.call_chains,
        vec![CallChain::new(
            vec!["OrderServiceImpl.getOrder".into()],
            vec![42],
            "OrderDao.findById",
            "ORDERS"
        )]
    );
    assert!(result.warnings.is_empty());
    assert!(result.unresolved_repository_references.is_empty());
    assert_eq!(result.impacts.len(), 1);
    assert_eq!(result.impacts[0].module, "shop");
    assert_eq!(
        result.impacts[0].fully_qualified_statement(),
        "com.shop.dao.OrderDao.findById"
    );
}

#[test]
fn test_self_delegating_dao_stays_out_of_its_own_chain() {
    let monolith = Monolith::new();
    monolith.write_mapper(
        "shop",
        "dao",
        "OrderDao",
        "com.shop.dao.OrderDao",
        r#"<select id="findById" resultType="Order">SELECT * FROM ORDERS WHERE id = #{id}</select>"#,
    );
    monolith.write_source(
        "shop",
        "dao/OrderDao.java",
        indoc! {"
            package com.shop.dao;

            public class OrderDao {
                public Order findById(long id) {
                    return findById(id, false);
                }

                public Order findById(long id, boolean lock) {
                    return null;
                }
            }
        "},
    );
    monolith.write_source(
        "shop",
        "service/OrderService.java",
        indoc! {"
            package com.shop.service;
            import com.shop.dao.OrderDao;
            public class OrderService {
                private OrderDao orderDao;
                public Order get(long id) {
                    return orderDao.findById(id);
                }
            }
        "},
    );
    let (analyzer, _sink) = in_memory_analyzer();
    analyzer.initialize(monolith.root()).unwrap();

    let result = analyzer.analyze_table_impact("ORDERS").unwrap();

    assert_eq!(
        result.call_chains,
        vec![CallChain::new(
            vec!["com.shop.service.OrderService.get".into()],
            vec![6],
            "OrderDao.findById",
            "ORDERS"
        )]
    );
    assert!(result
        .call_chains
        .iter()
        .all(|chain| chain.call_path.iter().all(|step| !step.ends_with(".findById"))));
}

#[test]
fn test_schema_qualified_query_matches() {
    let monolith = Monolith::new().with_orders();
    let (analyzer, _sink) = in_memory_analyzer();
    analyzer.initialize(monolith.root()).unwrap();

    let result = analyzer.analyze_table_impact("sales.Orders").unwrap();
    assert_eq!(result.call_chains.len(), 1);
}

#[test]
fn test_unknown_table_is_a_warning() {
    let monolith = Monolith::new().with_orders();
    let (analyzer, _sink) = in_memory_analyzer();
    analyzer.initialize(monolith.root()).unwrap();

    let result = analyzer.analyze_table_impact("audit_log").unwrap();

    assert!(result.impacts.is_empty());
    assert!(result.call_chains.is_empty());
    assert_eq!(
        result.warnings,
        vec!["No mapper methods found for table: AUDIT_LOG"]
    );
}

#[test]
fn test_query_before_initialize() {
    let (analyzer, _sink) = in_memory_analyzer();
    let err = analyzer.analyze_table_impact("ORDERS").unwrap_err();
    assert!(matches!(err, ImpactError::NotInitialized));
    assert_eq!(analyzer.get_statistics(), IndexStatistics::default());
}

#[test]
fn test_missing_namespace_is_skipped_with_warning() {
    let monolith = Monolith::new().with_orders();
    monolith.write_source(
        "shop",
        "legacy/xml/AuditDao.xml",
        r#"<mapper><insert id="log">INSERT INTO audit_log VALUES (#{a})</insert></mapper>"#,
    );
    let (analyzer, sink) = in_memory_analyzer();
    analyzer.initialize(monolith.root()).unwrap();

    let warnings: Vec<String> = sink
        .warnings()
        .into_iter()
        .filter(|w| w.contains("No namespace found"))
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("AuditDao.xml"));
    assert!(!analyzer
        .indexed_tables()
        .unwrap()
        .contains(&"AUDIT_LOG".to_string()));
}

#[test]
fn test_unresolved_repository_references_are_reported() {
    let monolith = Monolith::new().with_orders();
    monolith.write_mapper(
        "shop",
        "legacy",
        "LegacyDao",
        "com.shop.legacy.LegacyDao",
        r#"<select id="findAll">SELECT * FROM legacy_orders</select>"#,
    );
    let (analyzer, _sink) = in_memory_analyzer();
    analyzer.initialize(monolith.root()).unwrap();

    let result = analyzer.analyze_table_impact("LEGACY_ORDERS").unwrap();
    assert_eq!(result.unresolved_repository_references, vec!["[N/A]-LegacyDao"]);
    assert!(result.call_chains.is_empty());
    assert_eq!(
        result.warnings,
        vec!["No resolved repository methods found for table: LEGACY_ORDERS"]
    );
}

#[test]
fn test_uncalled_repository_method_gives_direct_chain() {
    let monolith = Monolith::new().with_orders();
    monolith.write_mapper(
        "shop",
        "dao",
        "AuditDao",
        "com.shop.dao.AuditDao",
        r#"<insert id="record">INSERT INTO audit_log (id) VALUES (#{id})</insert>"#,
    );
    monolith.write_source(
        "shop",
        "dao/AuditDao.java",
        "public interface AuditDao {\n    void record(long id);\n}\n",
    );
    let (analyzer, _sink) = in_memory_analyzer();
    analyzer.initialize(monolith.root()).unwrap();

    let result = analyzer.analyze_table_impact("audit_log").unwrap();
    assert_eq!(
        result.call_chains,
        vec![CallChain::direct("AuditDao.record", "AUDIT_LOG")]
    );
    assert!(result.impacts.is_empty());
}

#[test]
fn test_chain_climbs_through_non_business_callers() {
    let monolith = Monolith::new().with_orders();
    monolith.write_source(
        "shop",
        "web/OrderController.java",
        indoc! {"
            public class OrderController {
                private OrderLoader loader;

                public void show(long id) {
                    loader.load(id);
                }
            }
        "},
    );
    monolith.write_source(
        "shop",
        "web/OrderLoader.java",
        &java_with_call_at(
            "OrderLoader",
            "    private OrderDao orderDao;",
            "    public Order load(long id) {",
            "        return orderDao.findById(id);",
            9,
        ),
    );
    let (analyzer, _sink) = in_memory_analyzer();
    analyzer.initialize(monolith.root()).unwrap();

    let result = analyzer.analyze_table_impact("ORDERS").unwrap();
    let rendered: Vec<String> = result.call_chains.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec![
            "OrderServiceImpl.getOrder [line 42] -> OrderDao.findById [Table: ORDERS]",
            "OrderController.show [line 5] -> OrderLoader.load [line 9] -> OrderDao.findById [Table: ORDERS]",
        ]
    );
}

#[test]
fn test_analyze_tables_keeps_input_order() {
    let monolith = Monolith::new().with_orders();
    let (analyzer, _sink) = in_memory_analyzer();
    analyzer.initialize(monolith.root()).unwrap();

    let results = analyzer
        .analyze_tables(&["unknown", "orders", "ORDERS"])
        .unwrap();
    let names: Vec<&str> = results.iter().map(|r| r.table_name.as_str()).collect();
    assert_eq!(names, vec!["UNKNOWN", "ORDERS", "ORDERS"]);
    assert_eq!(results[1], results[2]);
}

#[test]
fn test_statistics_after_initialize() {
    let monolith = Monolith::new().with_orders();
    let (analyzer, _sink) = in_memory_analyzer();
    analyzer.initialize(monolith.root()).unwrap();

    let stats = analyzer.get_statistics();
    assert_eq!(stats.tables_indexed, 1);
    assert_eq!(stats.repository_mappings, 1);
    assert_eq!(stats.resolved_repository_methods, 1);
    assert_eq!(stats.unresolved_repository_methods, 0);
    assert_eq!(stats.distinct_callees, 1);
    assert_eq!(stats.total_call_references, 1);
}

#[test]
fn test_cancelled_initialize() {
    let monolith = Monolith::new().with_orders();
    let cancel = CancellationToken::new();
    let analyzer =
        ImpactAnalyzer::new(ImpactmapConfig::in_memory()).with_cancellation(cancel.clone());
    cancel.cancel();

    let err = analyzer.initialize(monolith.root()).unwrap_err();
    assert!(matches!(err, ImpactError::Cancelled));
    assert!(!analyzer.is_initialized());
}

#[test]
fn test_modules_span_the_whole_tree() {
    let monolith = Monolith::new().with_orders();
    monolith.add_module("billing");
    monolith.write_source(
        "billing",
        "billing/InvoiceService.java",
        &java_with_call_at(
            "InvoiceService",
            "    private OrderDao orders;",
            "    public void bill(long id) {",
            "        orders.findById(id);",
            12,
        ),
    );
    let (analyzer, _sink) = in_memory_analyzer();
    analyzer.initialize(monolith.root()).unwrap();

    let names: Vec<String> = analyzer.modules().into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["billing", "shop"]);

    let result = analyzer.analyze_table_impact("orders").unwrap();
    let entry_points: Vec<&str> = result.call_chains.iter().map(|c| c.entry_point()).collect();
    assert_eq!(
        entry_points,
        vec!["InvoiceService.bill", "OrderServiceImpl.getOrder"]
    );
}
