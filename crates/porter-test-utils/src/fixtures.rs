//! Sample sources and scenario repositories

use crate::fake_vcs::FakeVcs;

/// Conforming Java module
pub fn java_module(name: &str) -> String {
    format!(
        "package com.acme.algo;\n\
         \n\
         import org.springframework.stereotype.Component;\n\
         \n\
         /**\n\
         \x20* {name} computation step.\n\
         \x20*/\n\
         @Component\n\
         public class {name} extends AbstractModule {{\n\
         \n\
         \x20   @Override\n\
         \x20   public void execute() {{\n\
         \x20   }}\n\
         }}\n"
    )
}

/// Group module registering submodules
pub fn group_module(name: &str, submodules: &[&str]) -> String {
    let mut body = String::new();
    for sub in submodules {
        body.push_str(&format!("        addSubModule(new {sub}());\n"));
    }
    format!(
        "package com.acme.algo;\n\
         \n\
         import org.springframework.stereotype.Component;\n\
         \n\
         /**\n\
         \x20* Runs the {name} steps.\n\
         \x20*/\n\
         @Component\n\
         public class {name} extends AbstractUtilModuleGroup {{\n\
         \n\
         \x20   public {name}() {{\n\
         {body}\
         \x20   }}\n\
         }}\n"
    )
}

/// LoadAPI class with every required member
pub fn conforming_loader(name: &str) -> String {
    format!(
        "from loadapi.base import LoadApi\n\
         \n\
         \n\
         class {name}(LoadApi):\n\
         \x20   MASTER_HEADER = ['store_id', 'region', 'amount']\n\
         \n\
         \x20   def validate_row(self, row):\n\
         \x20       if not row.get('store_id'):\n\
         \x20           self._add_errors(row, 'store_id is required')\n\
         \n\
         \x20   def _get_normalized_data(self, rows):\n\
         \x20       return [dict(r) for r in rows]\n"
    )
}

/// LoadAPI class without `validate_row`
pub fn loader_without_validate_row(name: &str) -> String {
    format!(
        "from loadapi.base import LoadApi\n\
         \n\
         \n\
         class {name}(LoadApi):\n\
         \x20   MASTER_HEADER = ['store_id', 'region']\n\
         \n\
         \x20   def _get_normalized_data(self, rows):\n\
         \x20       self._add_errors(rows, 'unchecked')\n\
         \x20       return rows\n"
    )
}

/// Bulk-read SQL view over a template directory
pub fn sql_view(name: &str, columns: &[&str]) -> String {
    let list: Vec<String> = columns.iter().map(|c| format!("    {c} VARCHAR(64)")).collect();
    format!(
        "CREATE VIEW [dbo].[{name}] AS\n\
         SELECT *\n\
         FROM OPENROWSET(\n\
         \x20   BULK '{{{{child}}}}/{name}/*.tsv',\n\
         \x20   FORMAT = 'CSV',\n\
         \x20   FIELDTERMINATOR = '\\t'\n\
         ) WITH (\n\
         {}\n\
         ) AS rows;\n",
        list.join(",\n")
    )
}

/// Tab-delimited template with a header and `rows` data rows
pub fn tsv_template(columns: &[&str], rows: usize) -> String {
    let mut out = columns.join("\t");
    out.push('\n');
    for i in 0..rows {
        let row: Vec<String> = columns.iter().map(|c| format!("{c}_{i}")).collect();
        out.push_str(&row.join("\t"));
        out.push('\n');
    }
    out
}

/// Builds a [`FakeVcs`] with a target line and a diverging source line
///
/// The source branch is forked from the target on the first source commit.
#[derive(Debug)]
pub struct RepoBuilder {
    vcs: FakeVcs,
    target: String,
    source: String,
    forked: bool,
}

impl RepoBuilder {
    pub fn new(target: &str, source: &str) -> Self {
        let vcs = FakeVcs::new();
        if target != "main" {
            vcs.branch_from(target, "main");
        }
        Self {
            vcs,
            target: target.to_string(),
            source: source.to_string(),
            forked: false,
        }
    }

    /// Commit files onto the target line
    pub fn target_files(self, subject: &str, files: &[(&str, &str)]) -> Self {
        let changes: Vec<(&str, Option<&str>)> = files.iter().map(|(p, c)| (*p, Some(*c))).collect();
        self.vcs.commit_on(&self.target, subject, &changes);
        self
    }

    /// Commit changes onto the source line (`None` deletes)
    pub fn source_commit(mut self, subject: &str, changes: &[(&str, Option<&str>)]) -> Self {
        if !self.forked {
            self.vcs.branch_from(&self.source, &self.target);
            self.forked = true;
        }
        self.vcs.commit_on(&self.source, subject, changes);
        self
    }

    /// Finish with the target branch checked out
    pub fn build(self) -> FakeVcs {
        if !self.forked {
            self.vcs.branch_from(&self.source, &self.target);
        }
        self.vcs.switch_to(&self.target);
        self.vcs
    }

    /// Java repository: `develop` target, `feature` source with three
    /// conforming module commits
    pub fn java_three_commits() -> FakeVcs {
        let first = java_module("StoreLoadModule");
        let second = java_module("PriceModule");
        let third = java_module("RankModule");
        Self::new("develop", "feature")
            .target_files(
                "Add base modules",
                &[("src/main/java/com/acme/algo/BaseModule.java", &java_module("BaseModule"))],
            )
            .source_commit(
                "Add store load module",
                &[("src/main/java/com/acme/algo/StoreLoadModule.java", Some(&first))],
            )
            .source_commit(
                "Add price module",
                &[("src/main/java/com/acme/algo/PriceModule.java", Some(&second))],
            )
            .source_commit(
                "Add rank module",
                &[("src/main/java/com/acme/algo/RankModule.java", Some(&third))],
            )
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use porter_vcs::VersionControl;

    #[tokio::test]
    async fn java_scenario_has_three_source_commits() {
        let vcs = RepoBuilder::java_three_commits();
        let log = vcs.log_range("develop", "feature").await.unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].subject, "Add store load module");
        assert!(vcs.head().is_branch("develop"));
        assert!(vcs.is_clean().await.unwrap());
        assert_eq!(vcs.mutations(), 0);
    }

    #[test]
    fn templates_have_header_and_rows() {
        let tsv = tsv_template(&["a", "b"], 2);
        assert_eq!(tsv, "a\tb\na_0\tb_0\na_1\tb_1\n");
        assert!(sql_view("v", &["a"]).contains("{{child}}"));
    }
}
