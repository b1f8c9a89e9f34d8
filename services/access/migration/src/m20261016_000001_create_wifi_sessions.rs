use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WifiSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WifiSessions::UserId)
                            .string_len(255)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WifiSessions::Passcode).string_len(64).not_null())
                    .col(
                        ColumnDef::new(WifiSessions::GeneratedTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WifiSessions::ExpiryTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WifiSessions::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(WifiSessions::DeviceMacs)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WifiSessions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum WifiSessions {
    Table,
    UserId,
    Passcode,
    GeneratedTime,
    ExpiryTime,
    Status,
    DeviceMacs,
}
