pub use schoolbase_models::fees::{
    CreateFeeStructureDto, CreateInvoiceDto, CreateWaiverDto, FeeInvoice, FeePayment,
    FeeStructure, FeeStructureFilterParams, FeeWaiver, InvoiceDetail, InvoiceFilterParams,
    InvoiceStatus, Ledger, LedgerError, MyFees, OverdueInvoice, OverdueInvoiceRow, OverdueParams,
    PaymentReceipt, PaymentStatus, RecordPaymentDto, SweepReport, UpdateFeeStructureDto,
    UpdateInvoiceDto, UpdatePaymentStatusDto, WaiverFilterParams, WaiverWithStudent,
};
