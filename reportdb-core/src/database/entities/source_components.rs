use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Named set of `+`/`-` path rules, one per line
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "source_components")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub value: String,
    pub description: Option<String>,
    pub username: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Split the rule text into include and skip path patterns.
    pub fn rules(&self) -> (Vec<String>, Vec<String>) {
        let mut include = Vec::new();
        let mut skip = Vec::new();
        for line in self.value.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(path) = line.strip_prefix('+') {
                include.push(path.trim().to_string());
            } else if let Some(path) = line.strip_prefix('-') {
                skip.push(path.trim().to_string());
            }
        }
        (include, skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_rules_by_sign() {
        let component = Model {
            name: "core".to_string(),
            value: "+/src/*\n-/src/gen/*\n\n+ /lib/*".to_string(),
            description: None,
            username: None,
        };
        let (include, skip) = component.rules();
        assert_eq!(include, vec!["/src/*", "/lib/*"]);
        assert_eq!(skip, vec!["/src/gen/*"]);
    }
}
