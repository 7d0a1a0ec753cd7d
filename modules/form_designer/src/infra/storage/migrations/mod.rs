//! Database migrations for form designer

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_form_definitions::Migration),
            Box::new(m20250101_000002_create_form_logs::Migration),
        ]
    }
}

mod m20250101_000001_create_form_definitions {
    use super::*;

    #[derive(DeriveMigrationName)]
    pub struct Migration;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FormDefinitions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FormDefinitions::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(FormDefinitions::Name)
                                .string_len(255)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(FormDefinitions::RequireHash).boolean().not_null().default(false))
                        .col(ColumnDef::new(FormDefinitions::PrivateHash).string_len(40).not_null())
                        .col(ColumnDef::new(FormDefinitions::PublicHash).string_len(40).not_null())
                        .col(ColumnDef::new(FormDefinitions::Title).string_len(255))
                        .col(ColumnDef::new(FormDefinitions::Body).text())
                        .col(ColumnDef::new(FormDefinitions::Action).string_len(255))
                        .col(ColumnDef::new(FormDefinitions::MailTo).string_len(255))
                        .col(ColumnDef::new(FormDefinitions::MailFrom).string_len(255))
                        .col(ColumnDef::new(FormDefinitions::MailReplyTo).string_len(255))
                        .col(ColumnDef::new(FormDefinitions::MailSubject).string_len(255))
                        .col(ColumnDef::new(FormDefinitions::MailUploadedFiles).boolean().not_null().default(true))
                        .col(ColumnDef::new(FormDefinitions::Method).string_len(10).not_null().default("POST"))
                        .col(ColumnDef::new(FormDefinitions::SuccessMessage).string_len(255))
                        .col(ColumnDef::new(FormDefinitions::ErrorMessage).string_len(255))
                        .col(ColumnDef::new(FormDefinitions::SubmitLabel).string_len(255))
                        .col(ColumnDef::new(FormDefinitions::LogData).boolean().not_null().default(true))
                        .col(ColumnDef::new(FormDefinitions::SaveUploadedFiles).boolean().not_null().default(true))
                        .col(ColumnDef::new(FormDefinitions::SuccessRedirect).boolean().not_null().default(true))
                        .col(ColumnDef::new(FormDefinitions::SuccessClear).boolean().not_null().default(true))
                        .col(ColumnDef::new(FormDefinitions::AllowGetInitial).boolean().not_null().default(true))
                        .col(ColumnDef::new(FormDefinitions::MessageTemplate).text())
                        .col(ColumnDef::new(FormDefinitions::MessageTemplateName).string_len(255))
                        .col(ColumnDef::new(FormDefinitions::FormTemplateName).string_len(255))
                        .col(ColumnDef::new(FormDefinitions::DisplayLogged).boolean().not_null().default(false))
                        .col(ColumnDef::new(FormDefinitions::HtmlDefaultTemplate).boolean().not_null().default(false))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_form_definitions_public_hash")
                        .table(FormDefinitions::Table)
                        .col(FormDefinitions::PublicHash)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(FormDefinitionFields::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FormDefinitionFields::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(FormDefinitionFields::FormDefinitionId).integer().not_null())
                        .col(ColumnDef::new(FormDefinitionFields::FieldClass).string_len(100).not_null())
                        .col(ColumnDef::new(FormDefinitionFields::Position).integer().not_null().default(0))
                        .col(ColumnDef::new(FormDefinitionFields::Name).string_len(255).not_null())
                        .col(ColumnDef::new(FormDefinitionFields::Label).string_len(255))
                        .col(ColumnDef::new(FormDefinitionFields::Required).boolean().not_null().default(true))
                        .col(ColumnDef::new(FormDefinitionFields::IncludeResult).boolean().not_null().default(true))
                        .col(ColumnDef::new(FormDefinitionFields::Widget).string_len(100))
                        .col(ColumnDef::new(FormDefinitionFields::Initial).text())
                        .col(ColumnDef::new(FormDefinitionFields::HelpText).string_len(255))
                        .col(ColumnDef::new(FormDefinitionFields::ChoiceValues).text())
                        .col(ColumnDef::new(FormDefinitionFields::ChoiceLabels).text())
                        .col(ColumnDef::new(FormDefinitionFields::MaxLength).integer())
                        .col(ColumnDef::new(FormDefinitionFields::MinLength).integer())
                        .col(ColumnDef::new(FormDefinitionFields::MaxValue).double())
                        .col(ColumnDef::new(FormDefinitionFields::MinValue).double())
                        .col(ColumnDef::new(FormDefinitionFields::MaxDigits).integer())
                        .col(ColumnDef::new(FormDefinitionFields::DecimalPlaces).integer())
                        .col(ColumnDef::new(FormDefinitionFields::Regex).string_len(255))
                        .col(ColumnDef::new(FormDefinitionFields::ChoiceModel).string_len(255))
                        .col(ColumnDef::new(FormDefinitionFields::ChoiceModelEmptyLabel).string_len(255))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_form_definition_fields_definition")
                                .from(FormDefinitionFields::Table, FormDefinitionFields::FormDefinitionId)
                                .to(FormDefinitions::Table, FormDefinitions::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FormDefinitionFields::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(FormDefinitions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum FormDefinitions {
        Table,
        Id,
        Name,
        RequireHash,
        PrivateHash,
        PublicHash,
        Title,
        Body,
        Action,
        MailTo,
        MailFrom,
        MailReplyTo,
        MailSubject,
        MailUploadedFiles,
        Method,
        SuccessMessage,
        ErrorMessage,
        SubmitLabel,
        LogData,
        SaveUploadedFiles,
        SuccessRedirect,
        SuccessClear,
        AllowGetInitial,
        MessageTemplate,
        MessageTemplateName,
        FormTemplateName,
        DisplayLogged,
        HtmlDefaultTemplate,
    }

    #[derive(DeriveIden)]
    enum FormDefinitionFields {
        Table,
        Id,
        FormDefinitionId,
        FieldClass,
        Position,
        Name,
        Label,
        Required,
        IncludeResult,
        Widget,
        Initial,
        HelpText,
        ChoiceValues,
        ChoiceLabels,
        MaxLength,
        MinLength,
        MaxValue,
        MinValue,
        MaxDigits,
        DecimalPlaces,
        Regex,
        ChoiceModel,
        ChoiceModelEmptyLabel,
    }
}

mod m20250101_000002_create_form_logs {
    use super::m20250101_000001_create_form_definitions::FormDefinitions;
    use super::*;

    #[derive(DeriveMigrationName)]
    pub struct Migration;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FormLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FormLogs::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(FormLogs::FormDefinitionId).integer().not_null())
                        .col(
                            ColumnDef::new(FormLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(ColumnDef::new(FormLogs::CreatedBy).string_len(255))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_form_logs_definition")
                                .from(FormLogs::Table, FormLogs::FormDefinitionId)
                                .to(FormDefinitions::Table, FormDefinitions::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_form_logs_definition")
                        .table(FormLogs::Table)
                        .col(FormLogs::FormDefinitionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(FormValues::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FormValues::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(FormValues::FormLogId).integer().not_null())
                        .col(ColumnDef::new(FormValues::FieldName).string_len(255).not_null())
                        .col(ColumnDef::new(FormValues::Value).json())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_form_values_log")
                                .from(FormValues::Table, FormValues::FormLogId)
                                .to(FormLogs::Table, FormLogs::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FormValues::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(FormLogs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum FormLogs {
        Table,
        Id,
        FormDefinitionId,
        CreatedAt,
        CreatedBy,
    }

    #[derive(DeriveIden)]
    enum FormValues {
        Table,
        Id,
        FormLogId,
        FieldName,
        Value,
    }
}
