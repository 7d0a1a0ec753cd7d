//! SeaORM entities for database tables

/// Form definitions table
pub mod form_definition {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "form_definitions")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,

        /// Unique slug
        #[sea_orm(unique)]
        pub name: String,

        pub require_hash: bool,
        pub private_hash: String,
        pub public_hash: String,
        pub title: Option<String>,
        pub body: Option<String>,
        pub action: Option<String>,
        pub mail_to: Option<String>,
        pub mail_from: Option<String>,
        pub mail_reply_to: Option<String>,
        pub mail_subject: Option<String>,
        pub mail_uploaded_files: bool,

        /// "POST" or "GET"
        pub method: String,

        pub success_message: Option<String>,
        pub error_message: Option<String>,
        pub submit_label: Option<String>,
        pub log_data: bool,
        pub save_uploaded_files: bool,
        pub success_redirect: bool,
        pub success_clear: bool,
        pub allow_get_initial: bool,
        pub message_template: Option<String>,
        pub message_template_name: Option<String>,
        pub form_template_name: Option<String>,
        pub display_logged: bool,
        pub html_default_template: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::form_definition_field::Entity")]
        Fields,
        #[sea_orm(has_many = "super::form_log::Entity")]
        Logs,
    }

    impl Related<super::form_definition_field::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Fields.def()
        }
    }

    impl Related<super::form_log::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Logs.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Fields owned by a definition
pub mod form_definition_field {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "form_definition_fields")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub form_definition_id: i32,

        /// Field kind tag, e.g. "char" or "model_choice"
        pub field_class: String,

        pub position: i32,
        pub name: String,
        pub label: Option<String>,
        pub required: bool,
        pub include_result: bool,
        pub widget: Option<String>,
        pub initial: Option<String>,
        pub help_text: Option<String>,
        pub choice_values: Option<String>,
        pub choice_labels: Option<String>,
        pub max_length: Option<i32>,
        pub min_length: Option<i32>,
        pub max_value: Option<f64>,
        pub min_value: Option<f64>,
        pub max_digits: Option<i32>,
        pub decimal_places: Option<i32>,
        pub regex: Option<String>,
        pub choice_model: Option<String>,
        pub choice_model_empty_label: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::form_definition::Entity",
            from = "Column::FormDefinitionId",
            to = "super::form_definition::Column::Id"
        )]
        FormDefinition,
    }

    impl Related<super::form_definition::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::FormDefinition.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Submission logs
pub mod form_log {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "form_logs")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub form_definition_id: i32,
        pub created_at: DateTimeUtc,
        pub created_by: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::form_definition::Entity",
            from = "Column::FormDefinitionId",
            to = "super::form_definition::Column::Id"
        )]
        FormDefinition,
        #[sea_orm(has_many = "super::form_value::Entity")]
        Values,
    }

    impl Related<super::form_definition::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::FormDefinition.def()
        }
    }

    impl Related<super::form_value::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Values.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Values of a submission log
pub mod form_value {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "form_values")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub form_log_id: i32,
        /// Field name snapshot at submission time
        pub field_name: String,
        pub value: Option<Json>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::form_log::Entity",
            from = "Column::FormLogId",
            to = "super::form_log::Column::Id"
        )]
        FormLog,
    }

    impl Related<super::form_log::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::FormLog.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
