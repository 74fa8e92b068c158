use sea_orm_migration::prelude::*;

pub struct Migrator;

/// Money and quantity column. SQLite gets REAL affinity: sqlx reads decimals
/// there as `f64`, and NUMERIC affinity would store whole values as INTEGER.
pub(crate) fn decimal_col<T: IntoIden>(manager: &SchemaManager, col: T, scale: u32) -> ColumnDef {
    let mut def = ColumnDef::new(col);
    match manager.get_database_backend() {
        sea_orm::DatabaseBackend::Sqlite => def.double(),
        _ => def.decimal_len(16, scale),
    };
    def
}

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_users_and_sessions::Migration),
            Box::new(m20260101_000002_create_clients_table::Migration),
            Box::new(m20260101_000003_create_products_table::Migration),
            Box::new(m20260101_000004_create_orders_tables::Migration),
            Box::new(m20260101_000005_create_art_and_documents::Migration),
            Box::new(m20260101_000006_create_inventory_movements_table::Migration),
            Box::new(m20260101_000007_create_finance_tables::Migration),
            Box::new(m20260101_000008_create_sales_goals_table::Migration),
        ]
    }
}

mod m20260101_000001_create_users_and_sessions {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_users_and_sessions"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(
                            ColumnDef::new(Users::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Role).string().not_null())
                        .col(
                            ColumnDef::new(Users::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Sessions::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sessions::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Sessions::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(Sessions::TokenHash)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Sessions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sessions::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sessions::LastSeenAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sessions_user_id")
                                .from(Sessions::Table, Sessions::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sessions_user_id")
                        .table(Sessions::Table)
                        .col(Sessions::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sessions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        Role,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Sessions {
        Table,
        Id,
        UserId,
        TokenHash,
        CreatedAt,
        ExpiresAt,
        LastSeenAt,
    }
}

mod m20260101_000002_create_clients_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_clients_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Clients::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Clients::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Clients::Name).string().not_null())
                        .col(ColumnDef::new(Clients::Document).string().null())
                        .col(ColumnDef::new(Clients::Email).string().null())
                        .col(ColumnDef::new(Clients::Phone).string().null())
                        .col(ColumnDef::new(Clients::Address).string().null())
                        .col(ColumnDef::new(Clients::City).string().null())
                        .col(ColumnDef::new(Clients::State).string().null())
                        .col(ColumnDef::new(Clients::Notes).text().null())
                        .col(
                            ColumnDef::new(Clients::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Clients::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Clients::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // NULL documents never collide, so a plain unique index suffices
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_clients_document")
                        .table(Clients::Table)
                        .col(Clients::Document)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_clients_name")
                        .table(Clients::Table)
                        .col(Clients::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Clients::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Clients {
        Table,
        Id,
        Name,
        Document,
        Email,
        Phone,
        Address,
        City,
        State,
        Notes,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000003_create_products_table {
    use super::decimal_col;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Products::Sku)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Unit).string().not_null())
                        .col(
                            decimal_col(manager, Products::Quantity, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            decimal_col(manager, Products::MinQuantity, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            decimal_col(manager, Products::UnitCost, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Sku,
        Name,
        Unit,
        Quantity,
        MinQuantity,
        UnitCost,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000004_create_orders_tables {
    use super::decimal_col;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Orders::SellerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::ArtFinalistId).uuid().null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(
                            decimal_col(manager, Orders::Subtotal, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            decimal_col(manager, Orders::Discount, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            decimal_col(manager, Orders::TotalAmount, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::DeliveryDate).date().null())
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, col) in [
                ("idx_orders_status", Orders::Status),
                ("idx_orders_seller_id", Orders::SellerId),
                ("idx_orders_client_id", Orders::ClientId),
                ("idx_orders_delivery_date", Orders::DeliveryDate),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(Orders::Table)
                            .col(col)
                            .to_owned(),
                    )
                    .await?;
            }

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().null())
                        .col(ColumnDef::new(OrderItems::Description).string().not_null())
                        .col(ColumnDef::new(OrderItems::Size).string().null())
                        .col(ColumnDef::new(OrderItems::Material).string().null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            decimal_col(manager, OrderItems::UnitPrice, 2)
                                .not_null(),
                        )
                        .col(
                            decimal_col(manager, OrderItems::TotalPrice, 2)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderStatusHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderStatusHistory::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(OrderStatusHistory::OrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderStatusHistory::FromStatus)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(OrderStatusHistory::ToStatus)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderStatusHistory::ChangedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderStatusHistory::Note).text().null())
                        .col(
                            ColumnDef::new(OrderStatusHistory::ChangedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_status_history_order_id")
                                .from(OrderStatusHistory::Table, OrderStatusHistory::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_status_history_order_id")
                        .table(OrderStatusHistory::Table)
                        .col(OrderStatusHistory::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderStatusHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden, Clone, Copy)]
    pub(super) enum Orders {
        Table,
        Id,
        OrderNumber,
        ClientId,
        SellerId,
        ArtFinalistId,
        Status,
        Subtotal,
        Discount,
        TotalAmount,
        DeliveryDate,
        Notes,
        CreatedAt,
        UpdatedAt,
        Version,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        Description,
        Size,
        Material,
        Quantity,
        UnitPrice,
        TotalPrice,
    }

    #[derive(DeriveIden)]
    enum OrderStatusHistory {
        Table,
        Id,
        OrderId,
        FromStatus,
        ToStatus,
        ChangedBy,
        Note,
        ChangedAt,
    }
}

mod m20260101_000005_create_art_and_documents {
    use super::m20260101_000004_create_orders_tables::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000005_create_art_and_documents"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ArtVersions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ArtVersions::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ArtVersions::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(ArtVersions::VersionNumber)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ArtVersions::FileName).string().not_null())
                        .col(ColumnDef::new(ArtVersions::ContentType).string().not_null())
                        .col(ColumnDef::new(ArtVersions::StoredPath).string().not_null())
                        .col(
                            ColumnDef::new(ArtVersions::SizeBytes)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ArtVersions::UploadedBy).uuid().not_null())
                        .col(ColumnDef::new(ArtVersions::Status).string().not_null())
                        .col(ColumnDef::new(ArtVersions::Feedback).text().null())
                        .col(
                            ColumnDef::new(ArtVersions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ArtVersions::ReviewedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_art_versions_order_id")
                                .from(ArtVersions::Table, ArtVersions::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_art_versions_order_version")
                        .table(ArtVersions::Table)
                        .col(ArtVersions::OrderId)
                        .col(ArtVersions::VersionNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Documents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Documents::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Documents::OrderId).uuid().null())
                        .col(ColumnDef::new(Documents::ClientId).uuid().null())
                        .col(ColumnDef::new(Documents::Kind).string().not_null())
                        .col(ColumnDef::new(Documents::FileName).string().not_null())
                        .col(ColumnDef::new(Documents::ContentType).string().not_null())
                        .col(ColumnDef::new(Documents::StoredPath).string().not_null())
                        .col(
                            ColumnDef::new(Documents::SizeBytes)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Documents::UploadedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Documents::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, col) in [
                ("idx_documents_order_id", Documents::OrderId),
                ("idx_documents_client_id", Documents::ClientId),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(Documents::Table)
                            .col(col)
                            .to_owned(),
                    )
                    .await?;
            }

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Documents::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ArtVersions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ArtVersions {
        Table,
        Id,
        OrderId,
        VersionNumber,
        FileName,
        ContentType,
        StoredPath,
        SizeBytes,
        UploadedBy,
        Status,
        Feedback,
        CreatedAt,
        ReviewedAt,
    }

    #[derive(DeriveIden, Clone, Copy)]
    enum Documents {
        Table,
        Id,
        OrderId,
        ClientId,
        Kind,
        FileName,
        ContentType,
        StoredPath,
        SizeBytes,
        UploadedBy,
        CreatedAt,
    }
}

mod m20260101_000006_create_inventory_movements_table {
    use super::m20260101_000003_create_products_table::Products;
    use super::decimal_col;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000006_create_inventory_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryMovements::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryMovements::Kind).string().not_null())
                        .col(
                            decimal_col(manager, InventoryMovements::Quantity, 4)
                                .not_null(),
                        )
                        .col(
                            decimal_col(manager, InventoryMovements::BalanceAfter, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryMovements::Reason).string().null())
                        .col(ColumnDef::new(InventoryMovements::OrderId).uuid().null())
                        .col(
                            ColumnDef::new(InventoryMovements::CreatedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_movements_product_id")
                                .from(InventoryMovements::Table, InventoryMovements::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_movements_product_id")
                        .table(InventoryMovements::Table)
                        .col(InventoryMovements::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryMovements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryMovements {
        Table,
        Id,
        ProductId,
        Kind,
        Quantity,
        BalanceAfter,
        Reason,
        OrderId,
        CreatedBy,
        CreatedAt,
    }
}

mod m20260101_000007_create_finance_tables {
    use super::decimal_col;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000007_create_finance_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Receivables::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Receivables::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Receivables::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Receivables::OrderId).uuid().null())
                        .col(ColumnDef::new(Receivables::Description).string().not_null())
                        .col(
                            decimal_col(manager, Receivables::Amount, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Receivables::DueDate).date().not_null())
                        .col(ColumnDef::new(Receivables::Status).string().not_null())
                        .col(
                            ColumnDef::new(Receivables::PaidAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Receivables::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Payables::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Payables::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Payables::Supplier).string().not_null())
                        .col(ColumnDef::new(Payables::Category).string().not_null())
                        .col(ColumnDef::new(Payables::Description).string().not_null())
                        .col(
                            decimal_col(manager, Payables::Amount, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Payables::DueDate).date().not_null())
                        .col(ColumnDef::new(Payables::Status).string().not_null())
                        .col(
                            ColumnDef::new(Payables::PaidAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Payables::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_receivables_due_date")
                        .table(Receivables::Table)
                        .col(Receivables::DueDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payables_due_date")
                        .table(Payables::Table)
                        .col(Payables::DueDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Payables::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Receivables::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Receivables {
        Table,
        Id,
        ClientId,
        OrderId,
        Description,
        Amount,
        DueDate,
        Status,
        PaidAt,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Payables {
        Table,
        Id,
        Supplier,
        Category,
        Description,
        Amount,
        DueDate,
        Status,
        PaidAt,
        CreatedAt,
    }
}

mod m20260101_000008_create_sales_goals_table {
    use super::m20260101_000001_create_users_and_sessions::Users;
    use super::decimal_col;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000008_create_sales_goals_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SalesGoals::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesGoals::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SalesGoals::SellerId).uuid().not_null())
                        .col(ColumnDef::new(SalesGoals::Year).integer().not_null())
                        .col(ColumnDef::new(SalesGoals::Month).integer().not_null())
                        .col(
                            decimal_col(manager, SalesGoals::TargetAmount, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesGoals::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesGoals::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sales_goals_seller_id")
                                .from(SalesGoals::Table, SalesGoals::SellerId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_goals_seller_period")
                        .table(SalesGoals::Table)
                        .col(SalesGoals::SellerId)
                        .col(SalesGoals::Year)
                        .col(SalesGoals::Month)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SalesGoals::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SalesGoals {
        Table,
        Id,
        SellerId,
        Year,
        Month,
        TargetAmount,
        CreatedAt,
        UpdatedAt,
    }
}
