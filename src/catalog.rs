use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader};
use std::sync::{Arc, RwLock};

use crate::error::{DbError, DbResult};
use crate::heap_file::{table_id_for_path, HeapFile};
use crate::tuple::TupleDesc;
use crate::types::Type;

/// In-memory directory of tables: name and id both resolve to the same
/// `HeapFile`, loaded once from a schema text file at startup.
pub struct Catalog {
    tables_by_name: RwLock<HashMap<String, Arc<HeapFile>>>,
    tables_by_id: RwLock<HashMap<u32, Arc<HeapFile>>>,
    names_by_id: RwLock<HashMap<u32, String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            tables_by_name: RwLock::new(HashMap::new()),
            tables_by_id: RwLock::new(HashMap::new()),
            names_by_id: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_table(&self, name: String, file: HeapFile) {
        let file = Arc::new(file);
        let id = file.id();
        self.names_by_id.write().unwrap().insert(id, name.clone());
        self.tables_by_name.write().unwrap().insert(name, Arc::clone(&file));
        self.tables_by_id.write().unwrap().insert(id, file);
    }

    pub fn table_by_name(&self, name: &str) -> Option<Arc<HeapFile>> {
        self.tables_by_name.read().unwrap().get(name).map(Arc::clone)
    }

    pub fn table_by_id(&self, id: u32) -> Option<Arc<HeapFile>> {
        self.tables_by_id.read().unwrap().get(&id).map(Arc::clone)
    }

    pub fn desc_for(&self, table_id: u32) -> Option<TupleDesc> {
        self.table_by_id(table_id).map(|t| t.tuple_desc().clone())
    }

    /// Name a table was registered under, for `SeqScan`'s default alias
    /// and for error messages that name a table by id.
    pub fn name_for(&self, table_id: u32) -> Option<String> {
        self.names_by_id.read().unwrap().get(&table_id).cloned()
    }

    pub fn id_for(&self, name: &str) -> Option<u32> {
        self.table_by_name(name).map(|t| t.id())
    }

    /// Parses a schema file of lines shaped like `name (field: Type, ...)`
    /// and opens (creating if absent) one `data/<name>.dat` heap file per
    /// line, registering it under both its name and its path-derived id.
    pub fn load_schema(&self, schema_file_path: &str) -> DbResult<()> {
        let schema_path = std::path::Path::new(schema_file_path);
        let data_dir = schema_path
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join("data");
        let schema_file = std::fs::File::open(schema_path)?;
        let reader = BufReader::new(schema_file);
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.load_table_line(line, &data_dir)?;
        }
        Ok(())
    }

    fn load_table_line(&self, line: &str, data_dir: &std::path::Path) -> DbResult<()> {
        let open_paren = line
            .find('(')
            .ok_or_else(|| DbError::Other(format!("malformed schema line: {}", line)))?;
        let table_name = line[..open_paren].trim().to_string();
        let close_paren = line
            .rfind(')')
            .ok_or_else(|| DbError::Other(format!("malformed schema line: {}", line)))?;
        let fields_str = &line[open_paren + 1..close_paren];

        let mut field_types = vec![];
        let mut field_names = vec![];
        for field in fields_str.split(',') {
            let mut parts = field.split(':');
            let name = parts
                .next()
                .ok_or_else(|| DbError::Other(format!("malformed field in: {}", line)))?
                .trim()
                .to_string();
            let type_str = parts
                .next()
                .ok_or_else(|| DbError::Other(format!("missing type for field {}", name)))?
                .trim();
            let field_type = match type_str {
                "Int" => Type::Int,
                "String" => Type::Str,
                other => return Err(DbError::Other(format!("invalid field type: {}", other))),
            };
            field_names.push(name);
            field_types.push(field_type);
        }

        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(format!("{}.dat", table_name));
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        // Computed after open() so the file is guaranteed to exist and
        // `table_id_for_path` can canonicalize it rather than fall back.
        let table_id = table_id_for_path(&path);

        let heap_file = HeapFile::new(file, TupleDesc::named(field_types, field_names), table_id);
        self.add_table(table_name, heap_file);
        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_schema_registers_table_by_name_and_id() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("schema.txt");
        let mut schema = std::fs::File::create(&schema_path).unwrap();
        writeln!(schema, "widgets (id: Int, label: String)").unwrap();

        let catalog = Catalog::new();
        catalog.load_schema(schema_path.to_str().unwrap()).unwrap();

        let table = catalog.table_by_name("widgets").unwrap();
        assert_eq!(table.tuple_desc().len(), 2);
        assert!(catalog.table_by_id(table.id()).is_some());
    }
}
