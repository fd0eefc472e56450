// Fixture builders shared by the integration tests
#![allow(dead_code)]

use impactmap::{ImpactAnalyzer, ImpactmapConfig, MemorySink};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A throwaway Maven-style monolith on disk
pub struct Monolith {
    pub dir: TempDir,
}

impl Monolith {
    /// Aggregator root with one `shop` module
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pom.xml"), "<project/>").unwrap();
        let monolith = Self { dir };
        monolith.add_module("shop");
        monolith
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn add_module(&self, name: &str) {
        let module = self.root().join(name);
        fs::create_dir_all(module.join("src/main/java")).unwrap();
        fs::write(module.join("pom.xml"), "<project/>").unwrap();
    }

    /// Write `contents` at `relative` below the module's Java source root
    pub fn write_source(&self, module: &str, relative: &str, contents: &str) -> PathBuf {
        let path = self.root().join(module).join("src/main/java").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    /// Mapper `<dir>/xml/<Name>.xml` with the given statement elements
    pub fn write_mapper(&self, module: &str, dir: &str, name: &str, namespace: &str, body: &str) -> PathBuf {
        let contents = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <!DOCTYPE mapper PUBLIC \"-//mybatis.org//DTD Mapper 3.0//EN\" \"http://mybatis.org/dtd/mybatis-3-mapper.dtd\">\n\
             <mapper namespace=\"{namespace}\">\n{body}\n</mapper>\n"
        );
        self.write_source(module, &format!("{dir}/xml/{name}.xml"), &contents)
    }

    /// The canonical shop: `OrderDao.findById` reads ORDERS and is called
    /// from `OrderServiceImpl.getOrder` on line 42.
    pub fn with_orders(self) -> Self {
        self.write_mapper(
            "shop",
            "dao",
            "OrderDao",
            "com.shop.dao.OrderDao",
            r#"<select id="findById" resultType="Order">
                 SELECT * FROM ORDERS WHERE id = #{id}
               </select>"#,
        );
        self.write_source(
            "shop",
            "dao/OrderDao.java",
            "public interface OrderDao {\n    Order findById(long id);\n}\n",
        );
        self.write_source(
            "shop",
            "service/OrderServiceImpl.java",
            &java_with_call_at(
                "OrderServiceImpl",
                "    private OrderDao orderDao;",
                "    public Order getOrder(long id) {",
                "        return orderDao.findById(id);",
                42,
            ),
        );
        self
    }
}

/// A class whose single method makes `call` on line `line`
pub fn java_with_call_at(class: &str, field: &str, signature: &str, call: &str, line: usize) -> String {
    let mut lines = vec![format!("public class {class} {{"), field.to_string()];
    while lines.len() < line - 2 {
        lines.push(String::new());
    }
    lines.push(signature.to_string());
    lines.push(call.to_string());
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.join("\n") + "\n"
}

/// Analyzer with caching off and a capturing sink
pub fn in_memory_analyzer() -> (ImpactAnalyzer, Arc<MemorySink>) {
    analyzer_with(ImpactmapConfig::in_memory())
}

pub fn analyzer_with(config: ImpactmapConfig) -> (ImpactAnalyzer, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let analyzer = ImpactAnalyzer::new(config).with_sink(sink.clone());
    (analyzer, sink)
}

/// Caching on, in a directory under `cache_dir`
pub fn cached_config(cache_dir: &Path) -> ImpactmapConfig {
    let mut config = ImpactmapConfig::default();
    config.cache.dir = Some(cache_dir.to_path_buf());
    config
}
